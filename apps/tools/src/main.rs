use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use shared::{
    domain::{Order, OrderId},
    protocol::{ItemForm, NewItem},
};
use storage::Storage;
use wizard::OrderPersistence;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/workshop.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inserts the default makes and models into an empty catalog.
    SeedCatalog,
    ListModels {
        /// Only the make with this name (case-insensitive).
        #[arg(long)]
        make: Option<String>,
    },
    ShowOrder {
        order_id: i64,
    },
    ListOrders {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    PurgeSessions,
    /// Inserts the generated sample products into an empty product table.
    SeedProducts,
    AddItem {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url)
        .await
        .with_context(|| format!("opening {}", cli.database_url))?;

    match cli.command {
        Command::SeedCatalog => {
            if storage.seed_default_catalog().await? {
                println!("seeded default catalog");
            } else {
                println!("catalog already populated; nothing to do");
            }
        }
        Command::ListModels { make } => {
            let catalog = storage.list_catalog().await?;
            let mut shown = 0;
            for entry in catalog.iter().filter(|entry| {
                make.as_deref()
                    .map_or(true, |wanted| entry.make.name.eq_ignore_ascii_case(wanted))
            }) {
                shown += 1;
                println!("{} (make_id={})", entry.make.name, entry.make.id);
                for model in &entry.models {
                    println!("  {} (model_id={})", model.name, model.id);
                }
            }
            if shown == 0 {
                if let Some(make) = make {
                    bail!("no make named '{make}'");
                }
                println!("catalog is empty; run seed-catalog first");
            }
        }
        Command::ShowOrder { order_id } => {
            let order = storage
                .load_order(OrderId(order_id))
                .await?
                .with_context(|| format!("order {order_id} not found"))?;
            print_order(&order);
        }
        Command::ListOrders { limit } => {
            for order in storage.list_recent_orders(limit).await? {
                println!(
                    "#{} {} {} {} x{} for {} <{}>",
                    order.id,
                    order.created_at.format("%Y-%m-%d %H:%M"),
                    order.details.make.name,
                    order.details.model.name,
                    order.details.quantity,
                    order.details.contact_name,
                    order.details.contact_email,
                );
            }
        }
        Command::PurgeSessions => {
            let purged = storage.purge_expired_sessions().await?;
            println!("purged {purged} expired session(s)");
        }
        Command::SeedProducts => {
            if storage.seed_sample_products().await? {
                println!("seeded {} sample products", storage::SAMPLE_PRODUCT_COUNT);
            } else {
                println!("products already present; nothing to do");
            }
        }
        Command::AddItem { name, description } => {
            let new_item = validated_item(name, description)?;
            let item = storage
                .insert_item(&new_item.name, new_item.description.as_deref())
                .await?;
            println!("created item_id={}", item.id);
        }
    }

    Ok(())
}

/// Applies the same rules as the web form.
fn validated_item(name: String, description: Option<String>) -> Result<NewItem> {
    let form = ItemForm {
        name: Some(name),
        description,
    };
    form.validate().map_err(|errors| {
        let reasons: Vec<_> = errors.iter().map(|error| error.message.as_str()).collect();
        anyhow!("invalid item: {}", reasons.join("; "))
    })
}

fn print_order(order: &Order) {
    let details = &order.details;
    println!("order #{} ({})", order.id, order.status.as_str());
    println!("  placed:    {}", order.created_at.to_rfc3339());
    println!(
        "  vehicle:   {} {} {} x{}",
        details.product_category, details.make.name, details.model.name, details.quantity
    );
    println!(
        "  options:   {} / {} / {}",
        details.color, details.interior, details.tire_type
    );
    println!("  deliver:   {}", details.delivery_address);
    println!(
        "  contact:   {} <{}> {}",
        details.contact_name, details.contact_email, details.contact_phone
    );
    println!("  payment:   {} ({})", details.payment_method, details.billing_address);
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
