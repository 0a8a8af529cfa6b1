use clap::Parser;
use issue_modify::{
    app::{App, cli::Cli},
    errors::AppError,
    logging,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    if cli.args.print_log_dir {
        println!("Log directory: {}", logging::get_data_dir().display());
        return Ok(());
    }

    let mut app = App::new(cli).await?;
    app.run().await
}
