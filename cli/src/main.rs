// src/main.rs
use cli::App;
use structopt::StructOpt;

mod cli;

fn main() -> anyhow::Result<()> {
    let app = App::from_args();
    app.execute()
}
