#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

use samyra_bakery_lib::commands::{auth, design, diagnostics, menu, orders};
use samyra_bakery_lib::{init_tracing, Settings, Storefront};

#[derive(Parser)]
#[command(name = "samyra-bakery")]
#[command(about = "Samyra's Yummy Cakes storefront backend")]
#[command(version)]
struct Cli {
    /// Local data directory (database and logs).
    #[arg(long, global = true, env = "SAMYRA_DATA_DIR")]
    data_dir: Option<PathBuf>,
    /// Admin password for owner commands.
    #[arg(long, global = true, env = "SAMYRA_ADMIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up orders by order id (ORD-...) or phone number.
    Track { query: String },
    /// Show one order with its timeline.
    Order { id: String },
    /// Place a new order.
    Place(PlaceArgs),
    /// List orders (owner).
    Orders {
        /// `all` or one status name.
        #[arg(long, default_value = "all")]
        status: String,
    },
    /// Move an order to the next step (owner).
    Advance {
        id: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Cancel an order (owner).
    Cancel {
        id: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Set any status directly (owner).
    SetStatus {
        id: String,
        status: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Delete an order permanently (owner).
    Delete { id: String },
    /// Show the menu.
    Menu {
        /// Include hidden entries (owner).
        #[arg(long)]
        all: bool,
    },
    /// Manage catalog entries (owner).
    Product {
        #[command(subcommand)]
        command: ProductCommand,
    },
    /// Generate a cake concept from a description.
    Concept {
        prompt: String,
        /// Also render an image of the concept.
        #[arg(long)]
        image: bool,
    },
    /// Render a cake image from a visual prompt.
    Image { prompt: String },
    /// Ask the bakery assistant a question.
    Chat { message: String },
    /// Link a phone number to a customer account.
    LinkPhone {
        #[arg(long)]
        user_id: String,
        phone: String,
    },
    /// Orders visible to a customer account.
    MyOrders {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Check the admin password.
    Login,
    /// Set or change the admin password.
    SetAdminPassword {
        #[arg(long, env = "SAMYRA_NEW_ADMIN_PASSWORD", hide_env_values = true)]
        new_password: String,
    },
    /// Store the hosted backend connection.
    Connect {
        #[arg(long)]
        url: String,
        #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
        anon_key: String,
    },
    /// Delete stored credentials and return to local mode (owner).
    Reset,
    /// Version and build info.
    About,
    /// Active backend and local database status.
    Status,
}

#[derive(Args)]
struct PlaceArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    event_date: String,
    #[arg(long)]
    flavor: String,
    #[arg(long)]
    weight: String,
    #[arg(long)]
    occasion: String,
    #[arg(long, default_value = "")]
    details: String,
    /// Reference photo to attach.
    #[arg(long)]
    reference_image: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ProductCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        price_range: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Image file to upload.
        #[arg(long, conflicts_with = "image_url")]
        image: Option<PathBuf>,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(long, default_value_t = 0)]
        sort_order: i32,
        #[arg(long)]
        hidden: bool,
    },
    /// Change selected fields of an entry.
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        price_range: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(long)]
        sort_order: Option<i32>,
    },
    /// Upload a catalog photo and print its public URL.
    Upload { image: PathBuf },
    Hide { id: String },
    Show { id: String },
    Delete { id: String },
}

/// Guess an image MIME type from the file extension.
fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

fn image_payload(path: &Path) -> anyhow::Result<Value> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("invalid file name: {}", path.display()))?;
    Ok(json!({
        "fileName": file_name,
        "contentType": content_type_for(path),
        "dataBase64": BASE64_STANDARD.encode(bytes),
    }))
}

async fn dispatch(sf: &Storefront, cli: Cli) -> anyhow::Result<Value> {
    let password = cli.password;
    let result = match cli.command {
        Commands::Track { query } => orders::order_track(sf, Some(json!({ "query": query }))).await,
        Commands::Order { id } => orders::order_get(sf, Some(json!({ "orderId": id }))).await,
        Commands::Place(args) => {
            let reference_image_url = match &args.reference_image {
                Some(path) => {
                    let uploaded =
                        orders::order_upload_reference(sf, Some(image_payload(path)?)).await;
                    Some(uploaded.map_err(|e| anyhow!(e))?["url"].clone())
                }
                None => None,
            };
            orders::order_create(
                sf,
                Some(json!({
                    "customer_name": args.name,
                    "customer_phone": args.phone,
                    "event_date": args.event_date,
                    "cake_flavor": args.flavor,
                    "cake_weight": args.weight,
                    "occasion": args.occasion,
                    "details": args.details,
                    "reference_image_url": reference_image_url,
                })),
            )
            .await
        }
        Commands::Orders { status } => {
            orders::order_list(sf, Some(json!({ "password": password, "status": status }))).await
        }
        Commands::Advance { id, note } => {
            orders::order_advance(
                sf,
                Some(json!({ "password": password, "orderId": id, "note": note })),
            )
            .await
        }
        Commands::Cancel { id, note } => {
            orders::order_cancel(
                sf,
                Some(json!({ "password": password, "orderId": id, "note": note })),
            )
            .await
        }
        Commands::SetStatus { id, status, note } => {
            orders::order_update_status(
                sf,
                Some(json!({
                    "password": password,
                    "orderId": id,
                    "status": status,
                    "ownerNotes": note,
                })),
            )
            .await
        }
        Commands::Delete { id } => {
            orders::order_delete(sf, Some(json!({ "password": password, "orderId": id }))).await
        }
        Commands::Menu { all: false } => menu::menu_get_active(sf).await,
        Commands::Menu { all: true } => {
            menu::menu_get_all(sf, Some(json!({ "password": password }))).await
        }
        Commands::Product { command } => product(sf, password, command).await,
        Commands::Concept { prompt, image } => {
            design::design_concept(sf, Some(json!({ "prompt": prompt, "image": image }))).await
        }
        Commands::Image { prompt } => {
            design::design_image(sf, Some(json!({ "visualPrompt": prompt }))).await
        }
        Commands::Chat { message } => {
            design::design_chat(sf, Some(json!({ "message": message }))).await
        }
        Commands::LinkPhone { user_id, phone } => auth::account_link_phone(
            sf,
            Some(json!({ "user": { "id": user_id }, "phone": phone })),
        ),
        Commands::MyOrders { user_id, email } => {
            auth::account_orders(sf, Some(json!({ "user": { "id": user_id, "email": email } })))
                .await
        }
        Commands::Login => auth::admin_login(sf, Some(json!({ "password": password }))),
        Commands::SetAdminPassword { new_password } => auth::admin_set_password(
            sf,
            Some(json!({ "currentPassword": password, "newPassword": new_password })),
        ),
        Commands::Connect { url, anon_key } => diagnostics::settings_connect(
            sf,
            Some(json!({ "password": password, "url": url, "anonKey": anon_key })),
        ),
        Commands::Reset => {
            diagnostics::settings_factory_reset(sf, Some(json!({ "password": password })))
        }
        Commands::About => Ok(diagnostics::get_about_info()),
        Commands::Status => diagnostics::get_status(sf),
    };
    result.map_err(|e| anyhow!(e))
}

async fn product(
    sf: &Storefront,
    password: Option<String>,
    command: ProductCommand,
) -> Result<Value, String> {
    match command {
        ProductCommand::Add {
            name,
            category,
            price_range,
            description,
            image,
            image_url,
            sort_order,
            hidden,
        } => {
            let image_url = match image {
                Some(path) => {
                    let mut payload = image_payload(&path).map_err(|e| format!("{e:#}"))?;
                    payload["password"] = json!(password);
                    menu::product_upload_image(sf, Some(payload)).await?["url"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string()
                }
                None => image_url.unwrap_or_default(),
            };
            menu::product_create(
                sf,
                Some(json!({
                    "password": password,
                    "name": name,
                    "category": category,
                    "price_range": price_range,
                    "description": description,
                    "image_url": image_url,
                    "is_active": !hidden,
                    "sort_order": sort_order,
                })),
            )
            .await
        }
        ProductCommand::Update {
            id,
            name,
            category,
            price_range,
            description,
            image_url,
            sort_order,
        } => {
            menu::product_update(
                sf,
                Some(json!({
                    "password": password,
                    "productId": id,
                    "name": name,
                    "category": category,
                    "price_range": price_range,
                    "description": description,
                    "image_url": image_url,
                    "sort_order": sort_order,
                })),
            )
            .await
        }
        ProductCommand::Upload { image } => {
            let mut payload = image_payload(&image).map_err(|e| format!("{e:#}"))?;
            payload["password"] = json!(password);
            menu::product_upload_image(sf, Some(payload)).await
        }
        ProductCommand::Hide { id } => {
            menu::product_set_active(
                sf,
                Some(json!({ "password": password, "productId": id, "isActive": false })),
            )
            .await
        }
        ProductCommand::Show { id } => {
            menu::product_set_active(
                sf,
                Some(json!({ "password": password, "productId": id, "isActive": true })),
            )
            .await
        }
        ProductCommand::Delete { id } => {
            menu::product_delete(sf, Some(json!({ "password": password, "productId": id }))).await
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = dir.clone();
    }
    init_tracing(&settings.data_dir);

    let sf = Storefront::open(settings).map_err(|e| anyhow!(e))?;
    let output = dispatch(&sf, cli).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
