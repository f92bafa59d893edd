//! CLI tool to bootstrap an administrator account.
//!
//! Usage:
//!   cargo run --bin create-admin -- --name "Ana Pérez" --email ana@example.com
//!
//! The password is read from `TABLERO_ADMIN_PASSWORD` when `--password` is not given.

use std::env;

use tablero_lib::auth::hash_password;
use tablero_lib::config::Config;
use tablero_lib::db::users::NewUser;
use tablero_lib::db::DbPool;
use tablero_lib::models::user::CreateUserRequest;
use tablero_lib::models::Role;
use validator::Validate;

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    let mut name: Option<String> = None;
    let mut email: Option<String> = None;
    let mut password: Option<String> = env::var("TABLERO_ADMIN_PASSWORD").ok();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--name" | "-n" => {
                i += 1;
                name = args.get(i).cloned();
            }
            "--email" | "-e" => {
                i += 1;
                email = args.get(i).cloned();
            }
            "--password" | "-p" => {
                i += 1;
                password = args.get(i).cloned();
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let (Some(name), Some(email), Some(password)) = (name, email, password) else {
        eprintln!("Error: --name, --email and a password are required");
        print_usage();
        std::process::exit(1);
    };

    let request = CreateUserRequest {
        name,
        email,
        password,
        role: Some(Role::Administrator),
    };
    if let Err(e) = request.validate() {
        fail(e);
    }

    let config = Config::from_env().unwrap_or_else(|e| fail(format!("loading config: {}", e)));
    let pool = DbPool::new(&config.database)
        .await
        .unwrap_or_else(|e| fail(format!("connecting to database: {}", e)));
    if let Err(e) = pool.run_migrations().await {
        fail(format!("running migrations: {}", e));
    }

    match pool.find_user_by_email(&request.email).await {
        Ok(Some(_)) => fail(format!("a user with email {} already exists", request.email)),
        Ok(None) => {}
        Err(e) => fail(e),
    }

    let password_hash = hash_password(&request.password).unwrap_or_else(|e| fail(e));
    let user = pool
        .insert_user(NewUser {
            name: &request.name,
            email: &request.email,
            password_hash,
            role: Role::Administrator,
        })
        .await
        .unwrap_or_else(|e| fail(e));

    println!();
    println!("  Administrator created");
    println!();
    println!("  ID:    {}", user.id);
    println!("  Name:  {}", user.name);
    println!("  Email: {}", user.email);
    println!();
}

fn print_usage() {
    eprintln!();
    eprintln!("Usage: create-admin --name <name> --email <email> [--password <password>]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --name, -n        Display name (required)");
    eprintln!("  --email, -e       Login email (required)");
    eprintln!("  --password, -p    Password, at least 8 characters");
    eprintln!("                    (defaults to TABLERO_ADMIN_PASSWORD)");
    eprintln!();
}
