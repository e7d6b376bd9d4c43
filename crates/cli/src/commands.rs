//! CLI commands

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use clap::Subcommand;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shopfront_core::{BuildSlot, Order, OrderStatus, PcBuild, Role};
use shopfront_http::ShopClient;
use shopfront_http::types::{
    CategoryInput, CategoryPatch, DateRange, DeliveryServiceInput, DeliveryServicePatch,
    DiscountInput, DiscountPatch, NewOrder, OrderQuery, PageQuery, ProductInput, ProductPatch,
    ProductQuery, ProductSort, ProfilePatch, RegisterRequest, SalesInterval, UserPatch, UserQuery,
};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::CliConfig;

/// Everything a command needs, assembled once in `main`
pub struct Context {
    pub client: ShopClient,
    pub config: CliConfig,
    pub data_dir: PathBuf,
    pub config_path: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and sign in with it
    Register {
        #[arg(long)]
        email: String,

        #[arg(long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        phone: Option<String>,
    },

    /// Sign out and clear the stored session
    Logout,

    /// Show the signed-in user
    Whoami {
        /// Ask the server instead of reading the stored session
        #[arg(long)]
        remote: bool,
    },

    /// Product catalog
    Products {
        #[command(subcommand)]
        command: ProductCommands,
    },

    /// Product categories
    Categories {
        #[command(subcommand)]
        command: CategoryCommands,
    },

    /// Orders
    Orders {
        #[command(subcommand)]
        command: OrderCommands,
    },

    /// Discount codes
    Discounts {
        #[command(subcommand)]
        command: DiscountCommands,
    },

    /// Delivery services
    Delivery {
        #[command(subcommand)]
        command: DeliveryCommands,
    },

    /// User accounts
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Sales analytics
    Analytics {
        #[command(subcommand)]
        command: AnalyticsCommands,
    },

    /// List candidate parts compatible with a partial PC build
    Build {
        /// Slot to find parts for
        #[arg(long)]
        slot: BuildSlot,

        /// Already selected part, as SLOT=PRODUCT_ID (repeatable)
        #[arg(long = "part", value_parser = parse_part)]
        parts: Vec<(BuildSlot, String)>,

        /// Category holding the candidate parts
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        search: Option<String>,

        #[arg(long, default_value = "100")]
        limit: u32,
    },

    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ProductCommands {
    /// List products
    List {
        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        brand: Option<String>,

        /// price_asc, price_desc, newest or name
        #[arg(long, value_parser = parse_enum::<ProductSort>)]
        sort: Option<ProductSort>,
    },

    /// Show one product
    Get { id: String },

    /// Create a product from a JSON document
    Create {
        #[arg(long)]
        data: String,
    },

    /// Apply a JSON patch document to a product
    Update {
        id: String,

        #[arg(long)]
        data: String,
    },

    /// Delete a product
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    List,
    Get {
        id: String,
    },
    Create {
        #[arg(long)]
        data: String,
    },
    Update {
        id: String,

        #[arg(long)]
        data: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum OrderCommands {
    /// List all orders (staff)
    List {
        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long, value_parser = parse_enum::<OrderStatus>)]
        status: Option<OrderStatus>,
    },

    /// List the signed-in user's orders
    Mine,

    /// Show one order
    Get { id: String },

    /// Place an order from a JSON document
    Place {
        #[arg(long)]
        data: String,
    },

    /// Move an order to a new status (staff)
    Status {
        id: String,

        #[arg(value_parser = parse_enum::<OrderStatus>)]
        status: OrderStatus,
    },

    /// Cancel an order
    Cancel { id: String },
}

#[derive(Subcommand)]
pub enum DiscountCommands {
    List {
        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Check whether a code can be applied
    Validate {
        code: String,
    },

    Create {
        #[arg(long)]
        data: String,
    },

    Update {
        id: String,

        #[arg(long)]
        data: String,
    },

    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum DeliveryCommands {
    List,
    Create {
        #[arg(long)]
        data: String,
    },
    Update {
        id: String,

        #[arg(long)]
        data: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// List user accounts (staff)
    List {
        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        search: Option<String>,

        #[arg(long, value_parser = parse_enum::<Role>)]
        role: Option<Role>,
    },

    /// Show one account
    Get { id: String },

    /// Update the signed-in user's own profile
    UpdateProfile {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        address: Option<String>,
    },

    /// Update another account (staff)
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long, value_parser = parse_enum::<Role>)]
        role: Option<Role>,
    },

    /// Delete an account (staff)
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum AnalyticsCommands {
    /// Totals for a date range
    Summary {
        #[arg(long)]
        from: NaiveDate,

        #[arg(long)]
        to: NaiveDate,
    },

    /// Sales over time
    Sales {
        #[arg(long)]
        from: NaiveDate,

        #[arg(long)]
        to: NaiveDate,

        /// day, week or month
        #[arg(long, default_value = "day", value_parser = parse_enum::<SalesInterval>)]
        interval: SalesInterval,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration and file locations
    Show,
}

impl Commands {
    pub async fn execute(self, ctx: &Context) -> Result<()> {
        let client = &ctx.client;
        match self {
            Commands::Login { email, password } => {
                let user = client.login(&email, &password).await?;
                info!(user_id = %user.id, "Signed in");
                println!("Signed in as {} ({:?})", user.display_name(), user.role);
                Ok(())
            }
            Commands::Register {
                email,
                password,
                name,
                phone,
            } => {
                let account = RegisterRequest {
                    email,
                    password,
                    name,
                    phone,
                };
                let user = client.register(&account).await?;
                println!("Registered and signed in as {}", user.display_name());
                Ok(())
            }
            Commands::Logout => {
                // The local session is cleared even when the server call fails
                if let Err(e) = client.logout().await {
                    warn!("Server logout failed: {e}");
                }
                println!("Signed out");
                Ok(())
            }
            Commands::Whoami { remote } => {
                if remote {
                    print_json(&client.current_user().await?)
                } else {
                    match client.session().user() {
                        Some(user) => print_json(&user),
                        None => {
                            println!("Not signed in");
                            Ok(())
                        }
                    }
                }
            }
            Commands::Products { command } => command.execute(client).await,
            Commands::Categories { command } => command.execute(client).await,
            Commands::Orders { command } => command.execute(client).await,
            Commands::Discounts { command } => command.execute(client).await,
            Commands::Delivery { command } => command.execute(client).await,
            Commands::Users { command } => command.execute(client).await,
            Commands::Analytics { command } => command.execute(client).await,
            Commands::Build {
                slot,
                parts,
                category,
                search,
                limit,
            } => compatible_parts(client, slot, parts, category, search, limit).await,
            Commands::Config { command } => command.execute(ctx),
        }
    }
}

impl ProductCommands {
    pub async fn execute(self, client: &ShopClient) -> Result<()> {
        match self {
            ProductCommands::List {
                page,
                limit,
                search,
                category,
                brand,
                sort,
            } => {
                let query = ProductQuery {
                    page,
                    limit,
                    search,
                    category_id: category,
                    brand,
                    sort,
                    ..Default::default()
                };
                print_json(&client.list_products(&query).await?)
            }
            ProductCommands::Get { id } => print_json(&client.get_product(&id).await?),
            ProductCommands::Create { data } => {
                let product: ProductInput = parse_document(&data)?;
                print_json(&client.create_product(&product).await?)
            }
            ProductCommands::Update { id, data } => {
                let patch: ProductPatch = parse_document(&data)?;
                print_json(&client.update_product(&id, &patch).await?)
            }
            ProductCommands::Delete { id } => {
                client.delete_product(&id).await?;
                println!("Deleted product {id}");
                Ok(())
            }
        }
    }
}

impl CategoryCommands {
    pub async fn execute(self, client: &ShopClient) -> Result<()> {
        match self {
            CategoryCommands::List => print_json(&client.list_categories().await?),
            CategoryCommands::Get { id } => print_json(&client.get_category(&id).await?),
            CategoryCommands::Create { data } => {
                let category: CategoryInput = parse_document(&data)?;
                print_json(&client.create_category(&category).await?)
            }
            CategoryCommands::Update { id, data } => {
                let patch: CategoryPatch = parse_document(&data)?;
                print_json(&client.update_category(&id, &patch).await?)
            }
            CategoryCommands::Delete { id } => {
                client.delete_category(&id).await?;
                println!("Deleted category {id}");
                Ok(())
            }
        }
    }
}

impl OrderCommands {
    pub async fn execute(self, client: &ShopClient) -> Result<()> {
        match self {
            OrderCommands::List {
                page,
                limit,
                status,
            } => {
                let query = OrderQuery {
                    page,
                    limit,
                    status,
                };
                print_json(&client.list_orders(&query).await?)
            }
            OrderCommands::Mine => print_json(&client.my_orders().await?),
            OrderCommands::Get { id } => print_json(&client.get_order(&id).await?),
            OrderCommands::Place { data } => {
                let order: NewOrder = parse_document(&data)?;
                print_json(&client.place_order(&order).await?)
            }
            OrderCommands::Status { id, status } => {
                ensure_open(&client.get_order(&id).await?)?;
                print_json(&client.update_order_status(&id, status).await?)
            }
            OrderCommands::Cancel { id } => {
                ensure_open(&client.get_order(&id).await?)?;
                print_json(&client.cancel_order(&id).await?)
            }
        }
    }
}

impl DiscountCommands {
    pub async fn execute(self, client: &ShopClient) -> Result<()> {
        match self {
            DiscountCommands::List { page, limit } => {
                print_json(&client.list_discounts(&PageQuery { page, limit }).await?)
            }
            DiscountCommands::Validate { code } => {
                print_json(&client.validate_discount(&code).await?)
            }
            DiscountCommands::Create { data } => {
                let discount: DiscountInput = parse_document(&data)?;
                print_json(&client.create_discount(&discount).await?)
            }
            DiscountCommands::Update { id, data } => {
                let patch: DiscountPatch = parse_document(&data)?;
                print_json(&client.update_discount(&id, &patch).await?)
            }
            DiscountCommands::Delete { id } => {
                client.delete_discount(&id).await?;
                println!("Deleted discount {id}");
                Ok(())
            }
        }
    }
}

impl DeliveryCommands {
    pub async fn execute(self, client: &ShopClient) -> Result<()> {
        match self {
            DeliveryCommands::List => print_json(&client.list_delivery_services().await?),
            DeliveryCommands::Create { data } => {
                let service: DeliveryServiceInput = parse_document(&data)?;
                print_json(&client.create_delivery_service(&service).await?)
            }
            DeliveryCommands::Update { id, data } => {
                let patch: DeliveryServicePatch = parse_document(&data)?;
                print_json(&client.update_delivery_service(&id, &patch).await?)
            }
            DeliveryCommands::Delete { id } => {
                client.delete_delivery_service(&id).await?;
                println!("Deleted delivery service {id}");
                Ok(())
            }
        }
    }
}

impl UserCommands {
    pub async fn execute(self, client: &ShopClient) -> Result<()> {
        match self {
            UserCommands::List {
                page,
                limit,
                search,
                role,
            } => {
                let query = UserQuery {
                    page,
                    limit,
                    search,
                    role,
                };
                print_json(&client.list_users(&query).await?)
            }
            UserCommands::Get { id } => print_json(&client.get_user(&id).await?),
            UserCommands::UpdateProfile {
                name,
                phone,
                address,
            } => {
                let patch = ProfilePatch {
                    name,
                    phone,
                    address,
                };
                print_json(&client.update_profile(&patch).await?)
            }
            UserCommands::Update {
                id,
                name,
                phone,
                address,
                role,
            } => {
                let patch = UserPatch {
                    name,
                    phone,
                    address,
                    role,
                };
                print_json(&client.update_user(&id, &patch).await?)
            }
            UserCommands::Delete { id } => {
                client.delete_user(&id).await?;
                println!("Deleted user {id}");
                Ok(())
            }
        }
    }
}

impl AnalyticsCommands {
    pub async fn execute(self, client: &ShopClient) -> Result<()> {
        match self {
            AnalyticsCommands::Summary { from, to } => {
                print_json(&client.sales_summary(DateRange { from, to }).await?)
            }
            AnalyticsCommands::Sales { from, to, interval } => {
                print_json(&client.sales_series(DateRange { from, to }, interval).await?)
            }
        }
    }
}

impl ConfigCommands {
    pub fn execute(self, ctx: &Context) -> Result<()> {
        match self {
            ConfigCommands::Show => {
                print_json(&ctx.config)?;
                println!("Config file: {}", ctx.config_path.display());
                println!("Data directory: {}", ctx.data_dir.display());
                Ok(())
            }
        }
    }
}

async fn compatible_parts(
    client: &ShopClient,
    slot: BuildSlot,
    parts: Vec<(BuildSlot, String)>,
    category: Option<String>,
    search: Option<String>,
    limit: u32,
) -> Result<()> {
    let mut build = PcBuild::new();
    for (part_slot, id) in parts {
        let product = client
            .get_product(&id)
            .await
            .with_context(|| format!("Failed to load {part_slot} part {id}"))?;
        build.select(part_slot, product);
    }

    let query = ProductQuery {
        limit: Some(limit),
        search,
        category_id: category,
        ..Default::default()
    };
    let candidates = client.list_products(&query).await?.items;
    let compatible = build.compatible_candidates(slot, &candidates);
    info!(
        slot = %slot,
        candidates = candidates.len(),
        compatible = compatible.len(),
        "Filtered build candidates"
    );

    for (part_slot, product) in build.parts() {
        println!("{part_slot:<12} {} ({})", product.name, product.price);
    }
    println!("Selected total: {}", build.total_price());
    println!();
    println!("Compatible {slot} parts:");
    for product in compatible {
        println!("  {:<24} {:<40} {}", product.id, product.name, product.price);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Refuse to change an order that is already delivered or cancelled
fn ensure_open(order: &Order) -> Result<()> {
    if order.status.is_terminal() {
        anyhow::bail!("Order {} is already {:?}", order.id, order.status);
    }
    Ok(())
}

/// Parse a JSON request document given inline or as `@path/to/file.json`
fn parse_document<T: DeserializeOwned>(data: &str) -> Result<T> {
    let text = match data.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {path}"))?,
        None => data.to_string(),
    };
    serde_json::from_str(&text).context("Invalid JSON document")
}

/// Parse a wire-format enum value such as `shipped` or `price_desc`
fn parse_enum<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("invalid value: {value}"))
}

fn parse_part(value: &str) -> Result<(BuildSlot, String), String> {
    let (slot, id) = value
        .split_once('=')
        .ok_or_else(|| format!("expected SLOT=PRODUCT_ID, got {value}"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("missing product id in {value}"));
    }
    Ok((slot.parse()?, id.to_string()))
}
