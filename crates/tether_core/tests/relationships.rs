use serde::{Deserialize, Serialize};
use tether_core::store::schema::{
    provision_entity_table, provision_junction_table, provision_lookup_index,
};
use tether_core::{
    open_store_in_memory, Entity, NavigationList, RelationshipKind, RepoError, Repository,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Shop {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(skip)]
    products: NavigationList<Product>,
    #[serde(skip)]
    users: NavigationList<User>,
}

impl Entity for Shop {
    fn type_name() -> &'static str {
        "Shop"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn bind_relations(&mut self) {
        self.products = NavigationList::one_to_many(self.id.clone(), "Shop", "SoldBy");
        self.users = NavigationList::many_to_many(self.id.clone(), "Shop");
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Product {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "SoldBy")]
    sold_by: String,
}

impl Entity for Product {
    fn type_name() -> &'static str {
        "Product"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct User {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(skip)]
    shops: NavigationList<Shop>,
}

impl Entity for User {
    fn type_name() -> &'static str {
        "User"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn bind_relations(&mut self) {
        self.shops = NavigationList::many_to_many(self.id.clone(), "User");
    }
}

fn setup() -> rusqlite::Connection {
    let conn = open_store_in_memory().unwrap();
    provision_entity_table(&conn, "Shop").unwrap();
    provision_entity_table(&conn, "Product").unwrap();
    provision_entity_table(&conn, "User").unwrap();
    provision_lookup_index(&conn, "Product", "SoldBy").unwrap();
    provision_junction_table(&conn, "Shop", "User").unwrap();
    conn
}

fn insert_shop(repo: &Repository<'_>, name: &str) -> Shop {
    let mut shop = Shop {
        name: name.to_string(),
        ..Shop::default()
    };
    repo.insert(&mut shop).unwrap();
    shop.bind_relations();
    shop
}

fn insert_user(repo: &Repository<'_>, name: &str) -> User {
    let mut user = User {
        name: name.to_string(),
        ..User::default()
    };
    repo.insert(&mut user).unwrap();
    user.bind_relations();
    user
}

#[test]
fn one_to_many_lists_only_children_pointing_at_the_owner() {
    let conn = setup();
    let repo = Repository::new(&conn);

    let shop1 = insert_shop(&repo, "first");
    let shop2 = insert_shop(&repo, "second");

    let mut chair = Product {
        name: "chair".to_string(),
        sold_by: shop1.id.clone(),
        ..Product::default()
    };
    let mut table = Product {
        name: "table".to_string(),
        sold_by: shop1.id.clone(),
        ..Product::default()
    };
    let mut lamp = Product {
        name: "lamp".to_string(),
        sold_by: shop2.id.clone(),
        ..Product::default()
    };
    let chair_id = repo.insert(&mut chair).unwrap();
    let table_id = repo.insert(&mut table).unwrap();
    repo.insert(&mut lamp).unwrap();

    let mut expected = vec![chair_id, table_id];
    expected.sort();
    assert_eq!(shop1.products.ids(&repo).unwrap(), expected);
    assert_eq!(shop2.products.ids(&repo).unwrap(), vec![lamp.id.clone()]);

    assert_eq!(
        shop1.products.kind().unwrap(),
        RelationshipKind::OneToMany
    );
}

#[test]
fn one_to_many_resolves_full_children() {
    let conn = setup();
    let repo = Repository::new(&conn);

    let shop = insert_shop(&repo, "resolver");
    let mut chair = Product {
        name: "chair".to_string(),
        sold_by: shop.id.clone(),
        ..Product::default()
    };
    repo.insert(&mut chair).unwrap();

    let children = shop.products.resolve(&repo).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name, "chair");
    assert_eq!(children[0].sold_by, shop.id);
}

#[test]
fn adding_through_a_one_to_many_list_is_rejected() {
    let conn = setup();
    let repo = Repository::new(&conn);

    let shop = insert_shop(&repo, "strict");
    let mut chair = Product::default();
    let chair_id = repo.insert(&mut chair).unwrap();

    let err = shop.products.add(&repo, &chair_id).unwrap_err();
    assert!(matches!(err, RepoError::Referential(_)));
}

#[test]
fn many_to_many_edge_is_visible_from_both_sides() {
    let conn = setup();
    let repo = Repository::new(&conn);

    let shop = insert_shop(&repo, "market");
    let user = insert_user(&repo, "ada");

    // One edge write, added from the shop side only.
    shop.users.add(&repo, &user.id).unwrap();

    assert_eq!(shop.users.ids(&repo).unwrap(), vec![user.id.clone()]);
    assert_eq!(user.shops.ids(&repo).unwrap(), vec![shop.id.clone()]);
}

#[test]
fn many_to_many_add_is_idempotent() {
    let conn = setup();
    let repo = Repository::new(&conn);

    let shop = insert_shop(&repo, "market");
    let user = insert_user(&repo, "ada");

    shop.users.add(&repo, &user.id).unwrap();
    user.shops.add(&repo, &shop.id).unwrap();

    assert_eq!(shop.users.ids(&repo).unwrap(), vec![user.id.clone()]);
    assert_eq!(user.shops.ids(&repo).unwrap(), vec![shop.id.clone()]);
}

#[test]
fn many_to_many_add_requires_an_existing_target() {
    let conn = setup();
    let repo = Repository::new(&conn);

    let shop = insert_shop(&repo, "guarded");

    let err = shop.users.add(&repo, "no-such-user").unwrap_err();
    assert!(matches!(err, RepoError::Referential(_)));

    // The rejected add left no edge behind.
    assert!(shop.users.ids(&repo).unwrap().is_empty());
}

#[test]
fn stubs_batch_loads_members() {
    let conn = setup();
    let repo = Repository::new(&conn);

    let shop = insert_shop(&repo, "market");
    let user1 = insert_user(&repo, "ada");
    let user2 = insert_user(&repo, "grace");
    shop.users.add(&repo, &user1.id).unwrap();
    shop.users.add(&repo, &user2.id).unwrap();

    let mut names: Vec<String> = shop
        .users
        .stubs(&repo)
        .unwrap()
        .into_iter()
        .map(|u| u.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["ada".to_string(), "grace".to_string()]);
}

#[test]
fn resolving_a_dangling_edge_is_not_found() {
    let conn = setup();
    let repo = Repository::new(&conn);

    let shop = insert_shop(&repo, "market");
    let user = insert_user(&repo, "gone");
    shop.users.add(&repo, &user.id).unwrap();

    // The member vanishes; the edge stays.
    repo.delete("User", &user.id).unwrap();

    assert_eq!(shop.users.ids(&repo).unwrap(), vec![user.id.clone()]);
    let err = shop.users.resolve(&repo).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));

    // Best-effort stubs simply omit the missing member.
    assert!(shop.users.stubs(&repo).unwrap().is_empty());
}

#[test]
fn unbound_navigation_list_fails_every_operation() {
    let conn = setup();
    let repo = Repository::new(&conn);

    // A freshly deserialized instance has unbound navigation fields until
    // bind_relations runs.
    let shop = Shop::default();
    assert!(matches!(
        shop.users.ids(&repo).unwrap_err(),
        RepoError::Uninitialized
    ));
    assert!(matches!(
        shop.users.add(&repo, "u1").unwrap_err(),
        RepoError::Uninitialized
    ));
    assert!(matches!(
        shop.products.resolve(&repo).unwrap_err(),
        RepoError::Uninitialized
    ));
}

#[test]
fn empty_foreign_key_field_is_reported_as_misconfigured() {
    let conn = setup();
    let repo = Repository::new(&conn);

    let list: NavigationList<Product> = NavigationList::one_to_many("s1", "Shop", "");
    assert!(matches!(
        list.ids(&repo).unwrap_err(),
        RepoError::RelationConfig(_)
    ));
    assert!(matches!(
        list.resolve(&repo).unwrap_err(),
        RepoError::RelationConfig(_)
    ));
}

#[test]
fn self_referential_many_to_many_is_reported_as_misconfigured() {
    let conn = setup();
    let repo = Repository::new(&conn);

    let list: NavigationList<Shop> = NavigationList::many_to_many("s1", "Shop");
    assert!(matches!(
        list.ids(&repo).unwrap_err(),
        RepoError::RelationConfig(_)
    ));
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Order {
    #[serde(rename = "Id")]
    id: String,
    #[serde(skip)]
    lines: NavigationList<OrderLine>,
}

impl Entity for Order {
    fn type_name() -> &'static str {
        "Order"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn bind_relations(&mut self) {
        self.lines = NavigationList::many_to_many(self.id.clone(), "Order");
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OrderLine {
    #[serde(rename = "Id")]
    id: String,
    #[serde(skip)]
    orders: NavigationList<Order>,
}

impl Entity for OrderLine {
    fn type_name() -> &'static str {
        "OrderLine"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn bind_relations(&mut self) {
        self.orders = NavigationList::many_to_many(self.id.clone(), "OrderLine");
    }
}

#[test]
fn prefix_pair_junction_links_both_sides_from_the_reversed_side() {
    let conn = open_store_in_memory().unwrap();
    provision_entity_table(&conn, "Order").unwrap();
    provision_entity_table(&conn, "OrderLine").unwrap();
    provision_junction_table(&conn, "OrderLine", "Order").unwrap();
    let repo = Repository::new(&conn);

    let mut order = Order::default();
    repo.insert(&mut order).unwrap();
    order.bind_relations();

    let mut line = OrderLine::default();
    repo.insert(&mut line).unwrap();
    line.bind_relations();

    // "Order" is a strict prefix of "OrderLine", so it sorts first and the
    // line side goes through the reversed index. Adding from that side must
    // still produce the canonical edge.
    line.orders.add(&repo, &order.id).unwrap();

    assert_eq!(line.orders.ids(&repo).unwrap(), vec![order.id.clone()]);
    assert_eq!(order.lines.ids(&repo).unwrap(), vec![line.id.clone()]);

    // The edge landed in the canonically named junction table.
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM \"OrderOrderLine\";", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(count, 1);
}
