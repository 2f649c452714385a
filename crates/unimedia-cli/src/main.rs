use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;

use unimedia_cache::{CacheConfig, RedisCache};
use unimedia_cli::{NewAdmin, assign_role, create_admin};
use unimedia_db::{DatabaseConfig, init_db_pool};

#[derive(Parser)]
#[command(name = "unimedia-cli")]
#[command(about = "Unimedia CLI - account administration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an administrator account
    CreateAdmin {
        #[arg(short = 'e', long)]
        email: Option<String>,

        #[arg(short = 'u', long)]
        username: Option<String>,

        #[arg(short = 'f', long)]
        first_name: Option<String>,

        #[arg(short = 'l', long)]
        last_name: Option<String>,

        /// Prompted for securely if omitted
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Assign a role to an existing user
    AssignRole {
        #[arg(short = 'e', long)]
        email: String,

        /// Role name, e.g. `moderator`
        #[arg(short = 'r', long)]
        role: String,
    },
}

/// Connects to the API's permission cache when it is enabled.
async fn connect_cache() -> Option<RedisCache> {
    let config = CacheConfig::from_env();
    if !config.enabled {
        return None;
    }

    match RedisCache::new(&config.redis_url, config.ttl()).await {
        Ok(cache) => Some(cache),
        Err(e) => {
            eprintln!("⚠️  Could not reach Redis ({e}); cached permissions expire after their TTL");
            None
        }
    }
}

fn prompt(value: Option<String>, label: &str) -> anyhow::Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::new().with_prompt(label).interact_text()?),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let cli = Cli::parse();
    let pool = init_db_pool(&DatabaseConfig::from_env()?).await?;

    match cli.command {
        Commands::CreateAdmin {
            email,
            username,
            first_name,
            last_name,
            password,
        } => {
            let admin = NewAdmin {
                email: prompt(email, "Email address")?,
                username: prompt(username, "Username")?,
                first_name: prompt(first_name, "First name")?,
                last_name: prompt(last_name, "Last name")?,
                password: match password {
                    Some(p) => p,
                    None => Password::new()
                        .with_prompt("Password")
                        .with_confirmation("Confirm password", "Passwords don't match")
                        .interact()?,
                },
            };

            let user_id = create_admin(&pool, &admin).await?;
            println!("\n✅ Admin created");
            println!("   Id: {user_id}");
            println!("   Email: {}", admin.email);
        }
        Commands::AssignRole { email, role } => {
            let cache = connect_cache().await;
            if assign_role(&pool, cache.as_ref(), &email, &role).await? {
                println!("✅ Assigned role '{role}' to {email}");
            } else {
                println!("ℹ️  {email} already has role '{role}'");
            }
        }
    }

    Ok(())
}
