use std::num::ParseIntError;
use std::process::ExitCode;
use std::str::FromStr;

use basalt::{default_setup, solve, Coordinate, Tile, TileError, TileType, Token};
use clap::Parser;
use env_logger::Env;
use log::info;

/// Generate a balanced hexagonal board and print it
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Number of rings around the center tile
    #[arg(short, long, default_value_t = 2)]
    radius: u32,

    /// Log every rule as it is applied
    #[arg(short, long)]
    verbose: bool,

    /// Fix a tile before solving, as `q,r,TYPE` or `q,r,TYPE,TOKEN` (e.g. `0,0,desert` or `1,-1,clay,6`)
    #[arg(short, long)]
    pin: Vec<Pin>,
}

/// A tile given on the command line.
#[derive(Clone, Debug)]
struct Pin(Tile);

/// Reasons a `--pin` argument was rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
enum PinError {
    #[error("expected q,r,TYPE[,TOKEN], got \"{0}\"")]
    Malformed(String),
    #[error("bad coordinate: {0}")]
    Coordinate(#[from] ParseIntError),
    #[error("unknown tile type \"{0}\"")]
    UnknownType(String),
    #[error("bad token \"{0}\"")]
    BadToken(String),
    #[error(transparent)]
    Tile(#[from] TileError),
}

impl FromStr for Pin {
    type Err = PinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s.split(',').map(str::trim).collect::<Vec<_>>();
        let (q, r, tile_type, token) = match parts.as_slice() {
            [q, r, tile_type] => (q, r, tile_type, None),
            [q, r, tile_type, token] => (q, r, tile_type, Some(token)),
            _ => return Err(PinError::Malformed(s.to_string())),
        };

        let position = Coordinate::new(q.parse()?, r.parse()?);
        let tile_type = TileType::from_str(tile_type).map_err(|_| PinError::UnknownType(tile_type.to_string()))?;
        let token = token
            .map(|token| {
                token.parse::<u8>().ok()
                    .and_then(Token::from_value)
                    .ok_or_else(|| PinError::BadToken(token.to_string()))
            })
            .transpose()?;

        Ok(Pin(Tile::new(position, tile_type, token)?))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(filter)).init();

    match try_main(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn try_main(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (template, mut field) = default_setup(cli.radius);
    for Pin(tile) in &cli.pin {
        field = field.replace_at(tile.position(), *tile)?;
    }

    info!("generating a board of {} tiles", field.len());
    let board = solve(&field, &template)?;
    print!("{}", board);

    Ok(())
}
