use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "newsdesk", version, about = "Newsdesk admin backend CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the admin API service
    Serve,
    /// Apply pending database migrations
    Migrate,
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand)]
enum AdminCommand {
    /// Create the first admin account (no-op if one exists)
    Bootstrap {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    ResetPassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            let config = nd_admin_api::load_config()?;
            nd_admin_api::run(config).await
        }
        Commands::Migrate => {
            let database_url = nd_core::config::required_env("DATABASE_URL")?;
            let pool = nd_core::db::connect(&database_url).await?;
            nd_core::migrations::run(&pool).await?;
            println!("migrations applied");
            Ok(())
        }
        Commands::Admin { command } => {
            let database_url = nd_core::config::required_env("DATABASE_URL")?;
            let pool = nd_core::db::connect(&database_url).await?;
            match command {
                AdminCommand::Bootstrap { email, password } => {
                    if nd_core::admin::bootstrap_admin(&pool, &email, &password).await? {
                        println!("admin account created for {email}");
                    } else {
                        println!("an admin account already exists, nothing to do");
                    }
                    Ok(())
                }
                AdminCommand::ResetPassword { email, password } => {
                    nd_core::admin::reset_admin_password(&pool, &email, &password).await?;
                    println!("password reset for {email}");
                    Ok(())
                }
            }
        }
    }
}
