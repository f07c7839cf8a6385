//! The one-line command language of the interactive explorer.
//!
//! Commands are `NAME` or `NAME(arg,arg,...)`; names are case-insensitive,
//! file names keep their case.

use std::str::FromStr;

use thiserror::Error;

use crate::math::Point;

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("unknown command {0:?}")]
    Unknown(String),

    #[error("{command} expects {expected}")]
    Arguments { command: &'static str, expected: &'static str },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Exit,
    Load(String),
    LoadColor(String),
    SetSize { width: usize, height: usize },
    SetIterations { settle: usize, measure: usize },
    Rotate(f64),
    Stretch(f64),
    SetSequence(String),
    SetPosition { lower_left: Point, lower_right: Point, upper_left: Point },
    WalkParameter { lower: f64, upper: f64, count: u32 },
    WalkSequences { count: usize, len: usize },
    WalkSections,
    WalkRandomColors,
    WalkColorCollection,
    WalkDerivatives { value_id: i32, first: i32, last: i32, b_lower: f64, b_upper: f64, count: u32 },
    Crop { left: i64, bottom: i64, right: i64, top: i64 },
    WalkTiles { columns: usize, rows: usize },
    Center { x: i64, y: i64 },
    Save(String),
    Run(Option<(i64, i64)>),
}

fn split_call(line: &str) -> (&str, Option<&str>) {
    match line.find('(') {
        Some(open) => {
            let rest = &line[open + 1..];
            let args = rest.strip_suffix(')').unwrap_or(rest);
            (line[..open].trim(), Some(args.trim()))
        }
        None => (line.trim(), None),
    }
}

fn numbers<T: FromStr>(
    args: Option<&str>,
    n: usize,
    command: &'static str,
    expected: &'static str,
) -> Result<Vec<T>, CommandError> {
    let err = || CommandError::Arguments { command, expected };
    let values = args
        .ok_or_else(err)?
        .split(',')
        .map(|s| s.trim().parse::<T>().map_err(|_| err()))
        .collect::<Result<Vec<T>, _>>()?;
    if values.len() != n {
        return Err(err());
    }
    Ok(values)
}

fn text(args: Option<&str>, command: &'static str) -> Result<String, CommandError> {
    match args {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(CommandError::Arguments { command, expected: "a name" }),
    }
}

fn bare(args: Option<&str>, command: Command, name: &'static str) -> Result<Command, CommandError> {
    match args {
        None | Some("") => Ok(command),
        Some(_) => Err(CommandError::Arguments { command: name, expected: "no arguments" }),
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (name, args) = split_call(line.trim());
        let cmd = match name.to_ascii_uppercase().as_str() {
            "E" => bare(args, Command::Exit, "E")?,
            "LOAD" => Command::Load(text(args, "LOAD")?),
            "LOADCOLOR" => Command::LoadColor(text(args, "LOADCOLOR")?),
            "SETSIZE" => {
                let v: Vec<usize> = numbers(args, 2, "SETSIZE", "width,height")?;
                Command::SetSize { width: v[0], height: v[1] }
            }
            "SETITER" => {
                let v: Vec<usize> = numbers(args, 2, "SETITER", "settle,measure")?;
                Command::SetIterations { settle: v[0], measure: v[1] }
            }
            "ROTATEDEG" => Command::Rotate(numbers::<f64>(args, 1, "ROTATEDEG", "degrees")?[0]),
            "STRETCH" => Command::Stretch(numbers::<f64>(args, 1, "STRETCH", "a factor")?[0]),
            "SETSEQUENCE" => Command::SetSequence(text(args, "SETSEQUENCE")?),
            "SETPOSITION" => {
                let v: Vec<f64> = numbers(args, 6, "SETPOSITION", "llx,lly,lrx,lry,ulx,uly")?;
                Command::SetPosition {
                    lower_left: Point::new(v[0], v[1]),
                    lower_right: Point::new(v[2], v[3]),
                    upper_left: Point::new(v[4], v[5]),
                }
            }
            "WALKB" => {
                let v: Vec<f64> = numbers(args, 3, "WALKB", "lower,upper,count")?;
                let count = whole(v[2], "WALKB", "lower,upper,count")?;
                Command::WalkParameter { lower: v[0], upper: v[1], count }
            }
            "WALKSEQ" => {
                let v: Vec<usize> = numbers(args, 2, "WALKSEQ", "count,length")?;
                Command::WalkSequences { count: v[0], len: v[1] }
            }
            "WALKSECTION" => bare(args, Command::WalkSections, "WALKSECTION")?,
            "WALKRGB" => bare(args, Command::WalkRandomColors, "WALKRGB")?,
            "WALKCOLORS" => bare(args, Command::WalkColorCollection, "WALKCOLORS")?,
            "WALKDET" => {
                const EXPECTED: &str = "id,first,last,b0,b1,count";
                let v: Vec<f64> = numbers(args, 6, "WALKDET", EXPECTED)?;
                Command::WalkDerivatives {
                    value_id: whole(v[0], "WALKDET", EXPECTED)?,
                    first: whole(v[1], "WALKDET", EXPECTED)?,
                    last: whole(v[2], "WALKDET", EXPECTED)?,
                    b_lower: v[3],
                    b_upper: v[4],
                    count: whole(v[5], "WALKDET", EXPECTED)?,
                }
            }
            "CROP" | "C" => {
                let v: Vec<i64> = numbers(args, 4, "CROP", "left,bottom,right,top")?;
                Command::Crop { left: v[0], bottom: v[1], right: v[2], top: v[3] }
            }
            "WALKTILE" => {
                let v: Vec<usize> = numbers(args, 2, "WALKTILE", "columns,rows")?;
                Command::WalkTiles { columns: v[0], rows: v[1] }
            }
            "CENTER" => {
                let v: Vec<i64> = numbers(args, 2, "CENTER", "x,y")?;
                Command::Center { x: v[0], y: v[1] }
            }
            "SAVE" | "WR" => Command::Save(text(args, "SAVE")?),
            // a malformed range falls back to the whole grid
            "RUN" => Command::Run(
                numbers::<i64>(args, 2, "RUN", "start,end").ok().map(|v| (v[0], v[1])),
            ),
            _ => return Err(CommandError::Unknown(line.trim().to_string())),
        };
        Ok(cmd)
    }
}

/// Integer argument given in a list that also holds floats.
fn whole<T: TryFrom<i64>>(value: f64, command: &'static str, expected: &'static str) -> Result<T, CommandError> {
    let err = CommandError::Arguments { command, expected };
    if value.fract() != 0.0 {
        return Err(err);
    }
    T::try_from(value as i64).map_err(|_| err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn parse(line: &str) -> Result<Command, CommandError> {
        line.parse()
    }

    #[test]
    fn names_ignore_case_but_file_names_do_not() {
        assert_eq!(parse("load(Shots/First)"), Ok(Command::Load("Shots/First".into())));
        assert_eq!(parse("  e "), Ok(Command::Exit));
        assert_eq!(parse("wr(out.bmp)"), Ok(Command::Save("out.bmp".into())));
    }

    #[test]
    fn numeric_arguments() {
        assert_eq!(parse("SETSIZE(640, 480)"), Ok(Command::SetSize { width: 640, height: 480 }));
        assert_eq!(parse("c(10,90,50,20)"), Ok(Command::Crop { left: 10, bottom: 90, right: 50, top: 20 }));
        assert_eq!(parse("WALKB(2.5,3.5e0,10)"), Ok(Command::WalkParameter { lower: 2.5, upper: 3.5, count: 10 }));
        assert_eq!(
            parse("WALKDET(2,1,22,0.5,3,4)"),
            Ok(Command::WalkDerivatives { value_id: 2, first: 1, last: 22, b_lower: 0.5, b_upper: 3.0, count: 4 })
        );
        assert_eq!(
            parse("SETPOSITION(0,0,1,0,0,1)"),
            Ok(Command::SetPosition {
                lower_left: Point::new(0.0, 0.0),
                lower_right: Point::new(1.0, 0.0),
                upper_left: Point::new(0.0, 1.0),
            })
        );
    }

    #[test]
    fn run_with_and_without_range() {
        assert_eq!(parse("RUN"), Ok(Command::Run(None)));
        assert_eq!(parse("run(0,99)"), Ok(Command::Run(Some((0, 99)))));
        assert_eq!(parse("RUN(x)"), Ok(Command::Run(None)));
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(matches!(parse("FLY(1)"), Err(CommandError::Unknown(_))));
        assert!(matches!(parse("SETSIZE(1)"), Err(CommandError::Arguments { command: "SETSIZE", .. })));
        assert!(parse("SETITER(a,b)").is_err());
        assert!(parse("WALKB(1,2,3.5)").is_err());
        assert!(parse("WALKSECTION(3)").is_err());
        assert!(parse("LOAD()").is_err());
    }
}
