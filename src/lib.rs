pub mod color;
pub mod command;
pub mod config;
pub mod error;
pub mod field;
pub mod function;
pub mod geometry;
pub mod math;
pub mod palettes;
pub mod record;
pub mod render;
pub mod session;
pub mod store;
pub mod sweep;
pub mod walk;

pub use color::{ColorInterval, IntervalColorMap, MAX_INTERVALS, Rgb};
pub use command::{Command, CommandError};
pub use config::{CONFIG_FILE, Config};
pub use error::{LyapError, LyapResult};
pub use field::{LyapunovField, Symbol};
pub use function::{Band, Formula, MapFunction, Role};
pub use geometry::{Tile, Window};
pub use math::{Point, fast_cos, fast_sin};
pub use palettes::ColorFiles;
pub use render::{render_bmp, render_image};
pub use session::{Flow, Session};
pub use store::{
    FieldParams, load_coloring, load_grid, load_params, load_snapshot, save_description,
    save_grid, save_params, save_snapshot, stem_file,
};
pub use sweep::ParameterSweep;
pub use walk::Walker;
