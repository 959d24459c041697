//! Checkout Application CLI

use std::process;

use checkout_app::{
    database,
    domain::{
        products::{
            PgProductsService, ProductsService,
            models::{NewProduct, ProductUuid},
        },
        users::{
            PgUsersService, UsersService,
            models::{NewUser, UserUuid},
        },
    },
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "checkout-app", about = "Checkout CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending schema migrations.
    Migrate(MigrateArgs),
    User(UserCommand),
    Product(ProductCommand),
}

#[derive(Debug, Args)]
struct MigrateArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[derive(Debug, Args)]
struct UserCommand {
    #[command(subcommand)]
    command: UserSubcommand,
}

#[derive(Debug, Subcommand)]
enum UserSubcommand {
    Create(CreateUserArgs),
}

#[derive(Debug, Args)]
struct CreateUserArgs {
    /// Unique username
    #[arg(long)]
    username: String,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[derive(Debug, Args)]
struct ProductCommand {
    #[command(subcommand)]
    command: ProductSubcommand,
}

#[derive(Debug, Subcommand)]
enum ProductSubcommand {
    Create(CreateProductArgs),
}

#[derive(Debug, Args)]
struct CreateProductArgs {
    /// Display name
    #[arg(long)]
    name: String,

    /// Unit price in minor units
    #[arg(long)]
    price: u64,

    /// Initial stock level
    #[arg(long, default_value_t = 0)]
    stock: u64,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[tokio::main]
async fn main() {
    let _env = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        eprintln!("{error}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Migrate(args) => migrate(args).await,
        Commands::User(UserCommand {
            command: UserSubcommand::Create(args),
        }) => create_user(args).await,
        Commands::Product(ProductCommand {
            command: ProductSubcommand::Create(args),
        }) => create_product(args).await,
    }
}

async fn connect(database_url: &str) -> Result<database::Db, String> {
    let pool = database::connect(database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    Ok(database::Db::new(pool))
}

async fn migrate(args: MigrateArgs) -> Result<(), String> {
    let pool = database::connect(&args.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    database::MIGRATOR
        .run(&pool)
        .await
        .map_err(|error| format!("failed to run migrations: {error}"))?;

    println!("migrations applied");

    Ok(())
}

async fn create_user(args: CreateUserArgs) -> Result<(), String> {
    let db = connect(&args.database_url).await?;

    let user = PgUsersService::new(db)
        .create_user(NewUser {
            uuid: UserUuid::new(),
            username: args.username,
        })
        .await
        .map_err(|error| format!("failed to create user: {error}"))?;

    println!("user_uuid: {}", user.uuid);
    println!("username: {}", user.username);

    Ok(())
}

async fn create_product(args: CreateProductArgs) -> Result<(), String> {
    let db = connect(&args.database_url).await?;

    let product = PgProductsService::new(db)
        .create_product(NewProduct {
            uuid: ProductUuid::new(),
            name: args.name,
            price: args.price,
            stock_quantity: args.stock,
            discount: None,
        })
        .await
        .map_err(|error| format!("failed to create product: {error}"))?;

    println!("product_uuid: {}", product.uuid);
    println!("name: {}", product.name);
    println!("price: {}", product.price);
    println!("stock: {}", product.stock_quantity);

    Ok(())
}
