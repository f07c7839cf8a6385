use std::io::{self, Write};

use anyhow::Context;
use log::{info, warn};

use lyapunov_explorer::{CONFIG_FILE, Command, Config, Flow, Session};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let config = match Config::load_or_default(CONFIG_FILE) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("{CONFIG_FILE} ignored: {e}");
            Config::default()
        }
    };
    info!("writing output to {}", config.output_dir.display());
    let mut session = Session::new(config);

    println!("\n╭──────────────────────────────────────────────╮");
    println!("│            lyapunov field explorer           │");
    println!("│                                              │");
    println!("│ RUN / RUN(start,end)     sample and save     │");
    println!("│ LOAD(stem)  SAVE(stem)   LOADCOLOR(file)     │");
    println!("│ SETSIZE(w,h)             SETITER(s,m)        │");
    println!("│ SETSEQUENCE(ab..)        SETPOSITION(6 nums) │");
    println!("│ ROTATEDEG(d)  STRETCH(f) CENTER(x,y)         │");
    println!("│ CROP(l,b,r,t)            WALKTILE(nx,ny)     │");
    println!("│ WALKB(lo,hi,n)           WALKSEQ(n,len)      │");
    println!("│ WALKDET(id,d0,d1,b0,b1,n)                    │");
    println!("│ WALKSECTION  WALKRGB  WALKCOLORS             │");
    println!("│ E                        quit                │");
    println!("╰──────────────────────────────────────────────╯\n");

    loop {
        println!("{}================================", session.status());
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        let read = io::stdin().read_line(&mut input).context("Failed to read command")?;
        if read == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let command: Command = match input.parse() {
            Ok(cmd) => cmd,
            Err(e) => {
                println!("error: {e}\n");
                continue;
            }
        };
        match session.execute(command) {
            Ok(Flow::Exit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => println!("error: {e}\n"),
        }
    }

    Ok(())
}
