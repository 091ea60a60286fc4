use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};

mod cli;
mod util;
mod cmd_create;
mod cmd_cmp;
mod cmd_check;
mod cmd_info;

fn init_logger() {
    // RUST_LOG, по умолчанию info.
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

fn main() {
    init_logger();
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Create { src, store, include, exclude, hash, backend, chunk_size, mount_point, image_size_mb } =>
            cmd_create::exec(src, store, include, exclude, hash, backend, chunk_size, mount_point, image_size_mb),

        cli::Cmd::Cmp { store, file, entry, hash, backend, mount_point } =>
            cmd_cmp::exec(store, file, entry, hash, backend, mount_point),

        cli::Cmd::Check { src, store, include, exclude, hash, backend, mount_point, json } =>
            cmd_check::exec(src, store, include, exclude, hash, backend, mount_point, json),

        cli::Cmd::Info { store, backend, mount_point, json } =>
            cmd_info::exec(store, backend, mount_point, json),
    }
}
