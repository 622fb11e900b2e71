use super::*;
use wizard::{DraftUpdate, ResolvedProductSelection};

async fn seeded() -> Storage {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert!(storage.seed_default_catalog().await.expect("seed"));
    storage
}

async fn bmw_x5(storage: &Storage) -> (Make, CarModel) {
    let bmw = storage
        .list_makes()
        .await
        .expect("makes")
        .into_iter()
        .find(|make| make.name == "BMW")
        .expect("bmw");
    let x5 = storage
        .list_models_for_make(bmw.id)
        .await
        .expect("models")
        .into_iter()
        .find(|model| model.name == "X5")
        .expect("x5");
    (bmw, x5)
}

fn details(make: Make, model: CarModel) -> OrderDetails {
    OrderDetails {
        product_category: "SUV".into(),
        make,
        model,
        quantity: 2,
        color: "Black".into(),
        interior: "Leather".into(),
        tire_type: "Summer".into(),
        delivery_address: "1 Main St".into(),
        contact_name: "Ada".into(),
        contact_email: "ada@example.com".into(),
        contact_phone: "555-0100".into(),
        payment_method: "Card".into(),
        billing_address: "1 Main St".into(),
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("order_wizard_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn seeding_is_one_shot() {
    let storage = seeded().await;
    assert!(!storage.seed_default_catalog().await.expect("second seed"));

    let catalog = storage.list_catalog().await.expect("catalog");
    assert_eq!(catalog.len(), DEFAULT_CATALOG.len());
    let porsche = catalog
        .iter()
        .find(|entry| entry.make.name == "Porsche")
        .expect("porsche");
    assert_eq!(porsche.models.len(), 4);
}

#[tokio::test]
async fn catalog_lookups_resolve_ids() {
    let storage = seeded().await;
    let (bmw, x5) = bmw_x5(&storage).await;

    assert_eq!(storage.find_make(bmw.id).await.expect("make"), Some(bmw.clone()));
    assert_eq!(storage.find_model(x5.id).await.expect("model"), Some(x5.clone()));
    assert_eq!(x5.make_id, bmw.id);
    assert!(storage.find_make(MakeId(9999)).await.expect("make").is_none());
    assert!(storage
        .list_models_for_make(MakeId(9999))
        .await
        .expect("models")
        .is_empty());
}

#[tokio::test]
async fn commits_and_loads_confirmed_order() {
    let storage = seeded().await;
    let (bmw, x5) = bmw_x5(&storage).await;
    let session = storage.create_session().await.expect("session");

    let order_id = storage
        .commit_order(&session, &details(bmw, x5))
        .await
        .expect("commit");
    let order = storage
        .load_order(order_id)
        .await
        .expect("load")
        .expect("order exists");

    assert_eq!(order.id, order_id);
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.details.model.name, "X5");
    assert_eq!(order.details.make.name, "BMW");
    assert_eq!(order.details.quantity, 2);

    let recent = storage.list_recent_orders(10).await.expect("recent");
    assert_eq!(recent.len(), 1);
    assert!(storage
        .load_order(OrderId(order_id.0 + 1))
        .await
        .expect("load")
        .is_none());
}

#[tokio::test]
async fn session_draft_round_trips_through_json_column() {
    let storage = seeded().await;
    let (bmw, x5) = bmw_x5(&storage).await;
    let session = storage.create_session().await.expect("session");

    assert_eq!(storage.load_draft(&session).await.expect("load"), None);

    let mut draft = OrderDraft::new();
    draft.apply(DraftUpdate::ProductSelection(ResolvedProductSelection {
        product_category: "SUV".into(),
        make: bmw,
        model: x5,
        quantity: 1,
    }));
    storage.save_draft(&session, &draft).await.expect("save");
    assert_eq!(
        storage.load_draft(&session).await.expect("load"),
        Some(draft)
    );
}

#[tokio::test]
async fn commit_clears_draft_and_records_last_order() {
    let storage = seeded().await;
    let (bmw, x5) = bmw_x5(&storage).await;
    let session = storage.create_session().await.expect("session");
    storage
        .save_draft(&session, &OrderDraft::new())
        .await
        .expect("save");

    let order_id = storage
        .commit_order(&session, &details(bmw, x5))
        .await
        .expect("commit");

    assert_eq!(storage.load_draft(&session).await.expect("load"), None);
    assert_eq!(
        storage.last_confirmed_order(&session).await.expect("last"),
        Some(order_id)
    );
}

#[tokio::test]
async fn commit_for_expired_session_rolls_back_the_order() {
    let storage = seeded().await;
    let (bmw, x5) = bmw_x5(&storage).await;
    let session = storage.create_session().await.expect("session");
    storage
        .save_draft(&session, &OrderDraft::new())
        .await
        .expect("save");
    storage.expire_session(&session).await.expect("expire");

    let err = storage
        .commit_order(&session, &details(bmw, x5))
        .await
        .expect_err("expired session");
    assert!(matches!(
        err,
        CommitError::Session(SessionError::Expired(_))
    ));
    assert!(storage
        .list_recent_orders(10)
        .await
        .expect("recent")
        .is_empty());
}

#[tokio::test]
async fn unknown_or_expired_sessions_are_reported_as_expired() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let stranger = SessionId::generate();
    assert!(matches!(
        storage.load_draft(&stranger).await,
        Err(SessionError::Expired(_))
    ));
    assert!(!storage.touch_session(&stranger).await.expect("touch"));

    let session = storage.create_session().await.expect("session");
    assert!(storage.touch_session(&session).await.expect("touch"));

    storage.expire_session(&session).await.expect("expire");
    assert!(!storage.touch_session(&session).await.expect("touch"));
    assert!(matches!(
        storage.save_draft(&session, &OrderDraft::new()).await,
        Err(SessionError::Expired(_))
    ));

    assert_eq!(storage.purge_expired_sessions().await.expect("purge"), 1);
}

#[tokio::test]
async fn items_are_listed_newest_first() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let first = storage.insert_item("Lamp", None).await.expect("item");
    let second = storage
        .insert_item("Desk", Some("oak"))
        .await
        .expect("item");

    let items = storage.list_items().await.expect("items");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, second.id);
    assert_eq!(items[0].description.as_deref(), Some("oak"));
    assert_eq!(items[1].id, first.id);
    assert!(items[1].description.is_none());
}

#[tokio::test]
async fn todo_lifecycle() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let milk = storage.insert_todo("Buy milk").await.expect("insert");
    let bread = storage.insert_todo("Bake bread").await.expect("insert");
    assert!(!milk.done);

    let todos = storage.list_todos().await.expect("list");
    assert_eq!(todos, vec![milk.clone(), bread.clone()]);

    let toggled = storage
        .toggle_todo(milk.id)
        .await
        .expect("toggle")
        .expect("exists");
    assert!(toggled.done);
    let toggled_back = storage
        .toggle_todo(milk.id)
        .await
        .expect("toggle")
        .expect("exists");
    assert!(!toggled_back.done);

    let renamed = storage
        .update_todo_text(bread.id, "Bake rye bread")
        .await
        .expect("update")
        .expect("exists");
    assert_eq!(renamed.text, "Bake rye bread");
    assert_eq!(
        storage.find_todo(bread.id).await.expect("find"),
        Some(renamed)
    );

    assert!(storage.delete_todo(milk.id).await.expect("delete"));
    assert!(!storage.delete_todo(milk.id).await.expect("delete again"));
    assert_eq!(storage.list_todos().await.expect("list").len(), 1);
}

#[tokio::test]
async fn missing_todo_updates_report_none() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let ghost = TodoId(404);
    assert!(storage.find_todo(ghost).await.expect("find").is_none());
    assert!(storage.toggle_todo(ghost).await.expect("toggle").is_none());
    assert!(storage
        .update_todo_text(ghost, "x")
        .await
        .expect("update")
        .is_none());
}

async fn with_products() -> Storage {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert!(storage.seed_sample_products().await.expect("seed"));
    storage
}

#[tokio::test]
async fn sample_products_are_seeded_once_across_all_categories() {
    let storage = with_products().await;
    assert!(!storage.seed_sample_products().await.expect("second seed"));

    let categories = storage.list_product_categories().await.expect("categories");
    assert_eq!(categories.len(), 10);
    let mut sorted = categories.clone();
    sorted.sort();
    assert_eq!(categories, sorted);

    let all = storage
        .search_products(&ProductSearch::default())
        .await
        .expect("search");
    assert_eq!(all.total_items, SAMPLE_PRODUCT_COUNT as u64);
    assert_eq!(all.products.len(), PRODUCT_PAGE_SIZE as usize);
    assert_eq!(all.total_pages(), 15);
}

#[tokio::test]
async fn product_search_filters_by_name_and_category() {
    let storage = with_products().await;

    let by_name = storage
        .search_products(&ProductSearch {
            search: Some("LAPTOP".into()),
            ..ProductSearch::default()
        })
        .await
        .expect("search");
    assert!(by_name.total_items > 0);
    assert!(by_name
        .products
        .iter()
        .all(|product| product.name.to_lowercase().contains("laptop")));

    let by_category = storage
        .search_products(&ProductSearch {
            category: Some("Books".into()),
            ..ProductSearch::default()
        })
        .await
        .expect("search");
    assert_eq!(by_category.total_items, 15);
    assert!(by_category
        .products
        .iter()
        .all(|product| product.category == "Books"));

    let nothing = storage
        .search_products(&ProductSearch {
            search: Some("laptop".into()),
            category: Some("Food".into()),
            ..ProductSearch::default()
        })
        .await
        .expect("search");
    assert_eq!(nothing.total_items, 0);
    assert!(nothing.products.is_empty());
}

#[tokio::test]
async fn product_pages_follow_requested_sort() {
    let storage = with_products().await;

    let cheapest_first = storage
        .search_products(&ProductSearch {
            sort: ProductSort::Price,
            ..ProductSearch::default()
        })
        .await
        .expect("search");
    let prices: Vec<_> = cheapest_first
        .products
        .iter()
        .map(|product| product.price_cents)
        .collect();
    assert!(prices.windows(2).all(|pair| pair[0] <= pair[1]), "{prices:?}");

    let most_stock_first = storage
        .search_products(&ProductSearch {
            sort: ProductSort::Stock,
            direction: SortDirection::Desc,
            page: 1,
            ..ProductSearch::default()
        })
        .await
        .expect("search");
    assert_eq!(most_stock_first.page, 1);
    let stock: Vec<_> = most_stock_first
        .products
        .iter()
        .map(|product| product.stock)
        .collect();
    assert!(stock.windows(2).all(|pair| pair[0] >= pair[1]), "{stock:?}");

    let past_the_end = storage
        .search_products(&ProductSearch {
            page: 99,
            ..ProductSearch::default()
        })
        .await
        .expect("search");
    assert!(past_the_end.products.is_empty());
    assert_eq!(past_the_end.total_items, SAMPLE_PRODUCT_COUNT as u64);
}

#[tokio::test]
async fn deleting_a_product_shrinks_the_listing() {
    let storage = with_products().await;
    let first = storage
        .search_products(&ProductSearch::default())
        .await
        .expect("search")
        .products
        .remove(0);

    assert!(storage.delete_product(first.id).await.expect("delete"));
    assert!(!storage.delete_product(first.id).await.expect("delete again"));

    let after = storage
        .search_products(&ProductSearch::default())
        .await
        .expect("search");
    assert_eq!(after.total_items, SAMPLE_PRODUCT_COUNT as u64 - 1);
    assert!(after.products.iter().all(|product| product.id != first.id));
}
