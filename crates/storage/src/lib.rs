use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    domain::{
        CarModel, Item, ItemId, Make, MakeId, ModelId, Order, OrderDetails, OrderId, OrderStatus,
        Product, ProductId, ProductPage, ProductSearch, ProductSort, SessionId, SortDirection, Todo,
        TodoId, PRODUCT_PAGE_SIZE,
    },
    protocol::CatalogEntry,
};
use tracing::{debug, info};
use wizard::{
    CatalogLookup, CommitError, OrderDraft, OrderPersistence, SessionError, SessionStore,
};

pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 30 * 60;

/// Makes and models inserted by [`Storage::seed_default_catalog`].
pub const DEFAULT_CATALOG: &[(&str, &[&str])] = &[
    ("BMW", &["3 Series", "5 Series", "7 Series", "X3", "X5"]),
    (
        "Mercedes-Benz",
        &["A-Class", "C-Class", "E-Class", "S-Class", "GLE"],
    ),
    ("Audi", &["A3", "A4", "A6", "Q5", "Q7"]),
    ("Volkswagen", &["Golf", "Passat", "Tiguan", "Touareg"]),
    ("Porsche", &["911", "Cayenne", "Panamera", "Macan"]),
];

pub const SAMPLE_PRODUCT_COUNT: usize = 150;

const PRODUCT_CATEGORIES: [&str; 10] = [
    "Electronics",
    "Clothing",
    "Food",
    "Books",
    "Toys",
    "Sports",
    "Home",
    "Garden",
    "Tools",
    "Beauty",
];

const PRODUCT_ADJECTIVES: [&str; 10] = [
    "Premium",
    "Deluxe",
    "Classic",
    "Modern",
    "Vintage",
    "Professional",
    "Budget",
    "Luxury",
    "Standard",
    "Advanced",
];

/// Ten product nouns per entry of [`PRODUCT_CATEGORIES`], in the same order.
const PRODUCT_NOUNS: [[&str; 10]; 10] = [
    ["Laptop", "Mouse", "Keyboard", "Monitor", "Phone", "Tablet", "Headphones", "Speaker", "Camera", "Watch"],
    ["Shirt", "Pants", "Shoes", "Hat", "Jacket", "Dress", "Socks", "Gloves", "Belt", "Scarf"],
    ["Coffee", "Tea", "Chocolate", "Cookies", "Bread", "Cheese", "Milk", "Juice", "Water", "Snacks"],
    ["Novel", "Textbook", "Magazine", "Comic", "Dictionary", "Atlas", "Cookbook", "Guide", "Manual", "Journal"],
    ["Ball", "Doll", "Puzzle", "Game", "Car", "Train", "Plane", "Robot", "Bear", "Blocks"],
    ["Basketball", "Football", "Baseball", "Tennis", "Golf", "Bike", "Skateboard", "Helmet", "Bat", "Glove"],
    ["Chair", "Table", "Lamp", "Rug", "Pillow", "Blanket", "Curtain", "Mirror", "Clock", "Vase"],
    ["Seeds", "Shovel", "Rake", "Hose", "Pot", "Soil", "Fertilizer", "Gloves", "Pruner", "Sprinkler"],
    ["Hammer", "Screwdriver", "Wrench", "Drill", "Saw", "Pliers", "Tape", "Level", "Chisel", "File"],
    ["Shampoo", "Soap", "Lotion", "Cream", "Perfume", "Lipstick", "Mascara", "Foundation", "Brush", "Mirror"],
];

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
    session_ttl_seconds: i64,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            pool,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
        })
    }

    /// Sliding session lifetime applied on every session write or touch.
    pub fn with_session_ttl(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds.max(1);
        self
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    // Catalog

    /// Inserts [`DEFAULT_CATALOG`] when no make exists yet. Returns whether it did.
    pub async fn seed_default_catalog(&self) -> Result<bool> {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM makes")
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;
        for (make_name, model_names) in DEFAULT_CATALOG {
            let make_id: i64 = sqlx::query_scalar("INSERT INTO makes (name) VALUES (?) RETURNING id")
                .bind(*make_name)
                .fetch_one(&mut *tx)
                .await
                .with_context(|| format!("failed to insert make '{make_name}'"))?;
            for model_name in *model_names {
                sqlx::query("INSERT INTO car_models (make_id, name) VALUES (?, ?)")
                    .bind(make_id)
                    .bind(*model_name)
                    .execute(&mut *tx)
                    .await
                    .with_context(|| format!("failed to insert model '{model_name}'"))?;
            }
        }
        tx.commit().await?;
        info!(makes = DEFAULT_CATALOG.len(), "seeded default catalog");
        Ok(true)
    }

    pub async fn list_catalog(&self) -> Result<Vec<CatalogEntry>> {
        let mut entries = Vec::new();
        for make in CatalogLookup::list_makes(self).await? {
            let models = CatalogLookup::list_models_for_make(self, make.id).await?;
            entries.push(CatalogEntry { make, models });
        }
        Ok(entries)
    }

    // Orders

    pub async fn list_recent_orders(&self, limit: u32) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!("{ORDER_SELECT} ORDER BY o.id DESC LIMIT ?"))
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(order_from_row).collect()
    }

    // Items

    pub async fn insert_item(&self, name: &str, description: Option<&str>) -> Result<Item> {
        let date_time_added = Utc::now();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO items (name, description, date_time_added) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(description)
        .bind(date_time_added)
        .fetch_one(&self.pool)
        .await?;
        Ok(Item {
            id: ItemId(id),
            name: name.to_string(),
            description: description.map(str::to_string),
            date_time_added,
        })
    }

    /// Newest first.
    pub async fn list_items(&self) -> Result<Vec<Item>> {
        let rows = sqlx::query(
            "SELECT id, name, description, date_time_added FROM items ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| Item {
                id: ItemId(r.get::<i64, _>(0)),
                name: r.get::<String, _>(1),
                description: r.get::<Option<String>, _>(2),
                date_time_added: r.get::<DateTime<Utc>, _>(3),
            })
            .collect())
    }

    // Todos

    pub async fn list_todos(&self) -> Result<Vec<Todo>> {
        let rows = sqlx::query("SELECT id, text, done FROM todos ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(todo_from_row).collect())
    }

    pub async fn find_todo(&self, id: TodoId) -> Result<Option<Todo>> {
        let row = sqlx::query("SELECT id, text, done FROM todos WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(todo_from_row))
    }

    pub async fn insert_todo(&self, text: &str) -> Result<Todo> {
        let id: i64 = sqlx::query_scalar("INSERT INTO todos (text, done) VALUES (?, 0) RETURNING id")
            .bind(text)
            .fetch_one(&self.pool)
            .await
            .context("failed to insert todo")?;
        Ok(Todo {
            id: TodoId(id),
            text: text.to_string(),
            done: false,
        })
    }

    /// Returns the updated todo, or `None` when it does not exist.
    pub async fn update_todo_text(&self, id: TodoId, text: &str) -> Result<Option<Todo>> {
        let row = sqlx::query("UPDATE todos SET text = ? WHERE id = ? RETURNING id, text, done")
            .bind(text)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(todo_from_row))
    }

    pub async fn toggle_todo(&self, id: TodoId) -> Result<Option<Todo>> {
        let row = sqlx::query(
            "UPDATE todos SET done = CASE done WHEN 0 THEN 1 ELSE 0 END
             WHERE id = ? RETURNING id, text, done",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(todo_from_row))
    }

    /// Returns whether a todo was removed.
    pub async fn delete_todo(&self, id: TodoId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    // Products

    /// Inserts [`SAMPLE_PRODUCT_COUNT`] generated products when the table is empty.
    /// The data is deterministic. Returns whether it inserted anything.
    pub async fn seed_sample_products(&self) -> Result<bool> {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;
        for index in 0..SAMPLE_PRODUCT_COUNT {
            let (name, category, price_cents, stock) = sample_product(index);
            sqlx::query(
                "INSERT INTO products (name, category, price_cents, stock) VALUES (?, ?, ?, ?)",
            )
            .bind(&name)
            .bind(category)
            .bind(price_cents)
            .bind(i64::from(stock))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to insert product '{name}'"))?;
        }
        tx.commit().await?;
        info!(products = SAMPLE_PRODUCT_COUNT, "seeded sample products");
        Ok(true)
    }

    /// Case-insensitive name search within an optional category, one page at a time.
    /// A page past the end is empty.
    pub async fn search_products(&self, search: &ProductSearch) -> Result<ProductPage> {
        let filter = "WHERE (? IS NULL OR instr(LOWER(name), LOWER(?)) > 0)
                        AND (? IS NULL OR category = ?)";
        let term = search.search.as_deref();
        let category = search.category.as_deref();

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products {filter}"))
            .bind(term)
            .bind(term)
            .bind(category)
            .bind(category)
            .fetch_one(&self.pool)
            .await?;

        let column = match search.sort {
            ProductSort::Name => "name",
            ProductSort::Category => "category",
            ProductSort::Price => "price_cents",
            ProductSort::Stock => "stock",
        };
        let direction = match search.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        let rows = sqlx::query(&format!(
            "SELECT id, name, category, price_cents, stock FROM products {filter}
             ORDER BY {column} {direction}, id ASC LIMIT ? OFFSET ?"
        ))
        .bind(term)
        .bind(term)
        .bind(category)
        .bind(category)
        .bind(i64::from(PRODUCT_PAGE_SIZE))
        .bind(i64::from(search.page) * i64::from(PRODUCT_PAGE_SIZE))
        .fetch_all(&self.pool)
        .await?;

        Ok(ProductPage {
            products: rows.iter().map(product_from_row).collect::<Result<_>>()?,
            page: search.page,
            total_items: u64::try_from(total).context("negative product count")?,
        })
    }

    /// Distinct categories in alphabetical order.
    pub async fn list_product_categories(&self) -> Result<Vec<String>> {
        let categories =
            sqlx::query_scalar("SELECT DISTINCT category FROM products ORDER BY category ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    /// Returns whether a product was removed.
    pub async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    // Sessions

    pub async fn create_session(&self) -> Result<SessionId> {
        let session = SessionId::generate();
        sqlx::query("INSERT INTO sessions (id, expires_at) VALUES (?, ?)")
            .bind(session.to_string())
            .bind(self.next_expiry())
            .execute(&self.pool)
            .await?;
        debug!(%session, "session created");
        Ok(session)
    }

    /// Extends a live session. Returns `false` when it is unknown or already expired.
    pub async fn touch_session(&self, session: &SessionId) -> Result<bool> {
        let result = sqlx::query("UPDATE sessions SET expires_at = ? WHERE id = ? AND expires_at > ?")
            .bind(self.next_expiry())
            .bind(session.to_string())
            .bind(now_ts())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now_ts())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Moves a session's expiry into the past.
    #[cfg(any(test, feature = "test-util"))]
    pub async fn expire_session(&self, session: &SessionId) -> Result<()> {
        sqlx::query("UPDATE sessions SET expires_at = ? WHERE id = ?")
            .bind(now_ts() - 1)
            .bind(session.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn next_expiry(&self) -> i64 {
        now_ts() + self.session_ttl_seconds
    }
}

const ORDER_SELECT: &str = "SELECT o.id, o.product_category, o.make_id, mk.name, o.model_id, cm.name,
        o.quantity, o.color, o.interior, o.tire_type, o.delivery_address, o.contact_name,
        o.contact_email, o.contact_phone, o.payment_method, o.billing_address, o.status, o.created_at
     FROM orders o
     INNER JOIN makes mk ON mk.id = o.make_id
     INNER JOIN car_models cm ON cm.id = o.model_id";

fn order_from_row(r: &SqliteRow) -> Result<Order> {
    let make_id = MakeId(r.get::<i64, _>(2));
    let quantity = u32::try_from(r.get::<i64, _>(6)).context("stored quantity out of range")?;
    let status_raw = r.get::<String, _>(16);
    let status = OrderStatus::parse(&status_raw)
        .ok_or_else(|| anyhow!("unknown order status '{status_raw}'"))?;
    Ok(Order {
        id: OrderId(r.get::<i64, _>(0)),
        details: OrderDetails {
            product_category: r.get::<String, _>(1),
            make: Make {
                id: make_id,
                name: r.get::<String, _>(3),
            },
            model: CarModel {
                id: ModelId(r.get::<i64, _>(4)),
                name: r.get::<String, _>(5),
                make_id,
            },
            quantity,
            color: r.get::<String, _>(7),
            interior: r.get::<String, _>(8),
            tire_type: r.get::<String, _>(9),
            delivery_address: r.get::<String, _>(10),
            contact_name: r.get::<String, _>(11),
            contact_email: r.get::<String, _>(12),
            contact_phone: r.get::<String, _>(13),
            payment_method: r.get::<String, _>(14),
            billing_address: r.get::<String, _>(15),
        },
        status,
        created_at: r.get::<DateTime<Utc>, _>(17),
    })
}

fn todo_from_row(r: &SqliteRow) -> Todo {
    Todo {
        id: TodoId(r.get::<i64, _>(0)),
        text: r.get::<String, _>(1),
        done: r.get::<bool, _>(2),
    }
}

fn product_from_row(r: &SqliteRow) -> Result<Product> {
    Ok(Product {
        id: ProductId(r.get::<i64, _>(0)),
        name: r.get::<String, _>(1),
        category: r.get::<String, _>(2),
        price_cents: r.get::<i64, _>(3),
        stock: u32::try_from(r.get::<i64, _>(4)).context("stored stock out of range")?,
    })
}

/// Name, category, price in cents and stock of the `index`-th sample product.
fn sample_product(index: usize) -> (String, &'static str, i64, u32) {
    let category_index = (index * 7) % PRODUCT_CATEGORIES.len();
    let noun = PRODUCT_NOUNS[category_index][(index / PRODUCT_CATEGORIES.len() + index) % 10];
    let adjective = PRODUCT_ADJECTIVES[(index * 13) % PRODUCT_ADJECTIVES.len()];
    let step = index as i64;
    // 10.00 to 999.99
    let price_cents = 1_000 + (step * 7_919) % 99_000;
    let stock = ((index * 131) % 500) as u32;
    (
        format!("{adjective} {noun} {}", index + 1),
        PRODUCT_CATEGORIES[category_index],
        price_cents,
        stock,
    )
}

fn now_ts() -> i64 {
    Utc::now().timestamp()
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[async_trait]
impl CatalogLookup for Storage {
    async fn list_makes(&self) -> Result<Vec<Make>> {
        let rows = sqlx::query("SELECT id, name FROM makes ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| Make {
                id: MakeId(r.get::<i64, _>(0)),
                name: r.get::<String, _>(1),
            })
            .collect())
    }

    async fn find_make(&self, make_id: MakeId) -> Result<Option<Make>> {
        let row = sqlx::query("SELECT id, name FROM makes WHERE id = ?")
            .bind(make_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| Make {
            id: MakeId(r.get::<i64, _>(0)),
            name: r.get::<String, _>(1),
        }))
    }

    async fn find_model(&self, model_id: ModelId) -> Result<Option<CarModel>> {
        let row = sqlx::query("SELECT id, name, make_id FROM car_models WHERE id = ?")
            .bind(model_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| CarModel {
            id: ModelId(r.get::<i64, _>(0)),
            name: r.get::<String, _>(1),
            make_id: MakeId(r.get::<i64, _>(2)),
        }))
    }

    async fn list_models_for_make(&self, make_id: MakeId) -> Result<Vec<CarModel>> {
        let rows =
            sqlx::query("SELECT id, name, make_id FROM car_models WHERE make_id = ? ORDER BY id ASC")
                .bind(make_id.0)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|r| CarModel {
                id: ModelId(r.get::<i64, _>(0)),
                name: r.get::<String, _>(1),
                make_id: MakeId(r.get::<i64, _>(2)),
            })
            .collect())
    }
}

#[async_trait]
impl OrderPersistence for Storage {
    async fn commit_order(
        &self,
        session: &SessionId,
        details: &OrderDetails,
    ) -> Result<OrderId, CommitError> {
        let mut tx = self.pool.begin().await.map_err(anyhow::Error::from)?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO orders (
                product_category, make_id, model_id, quantity, color, interior, tire_type,
                delivery_address, contact_name, contact_email, contact_phone,
                payment_method, billing_address, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id",
        )
        .bind(&details.product_category)
        .bind(details.make.id.0)
        .bind(details.model.id.0)
        .bind(i64::from(details.quantity))
        .bind(&details.color)
        .bind(&details.interior)
        .bind(&details.tire_type)
        .bind(&details.delivery_address)
        .bind(&details.contact_name)
        .bind(&details.contact_email)
        .bind(&details.contact_phone)
        .bind(&details.payment_method)
        .bind(&details.billing_address)
        .bind(OrderStatus::Confirmed.as_str())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .context("failed to insert order")?;

        let result = sqlx::query(
            "UPDATE sessions SET draft_json = NULL, last_order_id = ?, expires_at = ?
             WHERE id = ? AND expires_at > ?",
        )
        .bind(id)
        .bind(self.next_expiry())
        .bind(session.to_string())
        .bind(now_ts())
        .execute(&mut *tx)
        .await
        .context("failed to clear session draft")?;
        if result.rows_affected() == 0 {
            // Dropping the transaction rolls the order insert back.
            return Err(SessionError::Expired(*session).into());
        }

        tx.commit().await.context("failed to commit order")?;
        debug!(%session, order_id = id, "order committed");
        Ok(OrderId(id))
    }

    async fn load_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("{ORDER_SELECT} WHERE o.id = ?"))
            .bind(order_id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(order_from_row).transpose()
    }
}

#[async_trait]
impl SessionStore for Storage {
    async fn load_draft(&self, session: &SessionId) -> Result<Option<OrderDraft>, SessionError> {
        let row = sqlx::query("SELECT draft_json FROM sessions WHERE id = ? AND expires_at > ?")
            .bind(session.to_string())
            .bind(now_ts())
            .fetch_optional(&self.pool)
            .await
            .map_err(anyhow::Error::from)?;
        let Some(row) = row else {
            return Err(SessionError::Expired(*session));
        };
        let Some(raw) = row.get::<Option<String>, _>(0) else {
            return Ok(None);
        };
        let draft = serde_json::from_str(&raw)
            .with_context(|| format!("corrupt draft in session {session}"))?;
        Ok(Some(draft))
    }

    async fn save_draft(&self, session: &SessionId, draft: &OrderDraft) -> Result<(), SessionError> {
        let raw = serde_json::to_string(draft).context("failed to encode draft")?;
        let result = sqlx::query(
            "UPDATE sessions SET draft_json = ?, expires_at = ? WHERE id = ? AND expires_at > ?",
        )
        .bind(raw)
        .bind(self.next_expiry())
        .bind(session.to_string())
        .bind(now_ts())
        .execute(&self.pool)
        .await
        .map_err(anyhow::Error::from)?;
        if result.rows_affected() == 0 {
            return Err(SessionError::Expired(*session));
        }
        Ok(())
    }

    async fn last_confirmed_order(
        &self,
        session: &SessionId,
    ) -> Result<Option<OrderId>, SessionError> {
        let row = sqlx::query("SELECT last_order_id FROM sessions WHERE id = ? AND expires_at > ?")
            .bind(session.to_string())
            .bind(now_ts())
            .fetch_optional(&self.pool)
            .await
            .map_err(anyhow::Error::from)?;
        let Some(row) = row else {
            return Err(SessionError::Expired(*session));
        };
        Ok(row.get::<Option<i64>, _>(0).map(OrderId))
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
