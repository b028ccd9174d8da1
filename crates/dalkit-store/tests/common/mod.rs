use std::path::Path;

use chrono::NaiveDate;
use dalkit_core::{FieldTable, Record, RecordMeta};
use dalkit_store::{ConnectionSettings, DalConfig, UnitOfWork, UnitOfWorkFactory};
use rusqlite::Connection;

#[allow(dead_code)]
pub const SCHEMA: &str = "
    CREATE TABLE Customer (
        Id TEXT PRIMARY KEY,
        DateCreated TEXT NOT NULL,
        DateUpdated TEXT,
        Name TEXT NOT NULL,
        Email TEXT,
        Tier TEXT NOT NULL,
        Active INTEGER NOT NULL
    );
    CREATE TABLE Supplier (
        Id TEXT PRIMARY KEY,
        DateCreated TEXT NOT NULL,
        DateUpdated TEXT,
        Name TEXT NOT NULL,
        Country TEXT NOT NULL
    );
    CREATE TABLE Product (
        Id TEXT PRIMARY KEY,
        DateCreated TEXT NOT NULL,
        DateUpdated TEXT,
        Name TEXT NOT NULL,
        Price REAL NOT NULL,
        Quantity INTEGER NOT NULL,
        Status TEXT NOT NULL,
        ReleasedOn TEXT,
        SupplierId TEXT REFERENCES Supplier(Id)
    );
";

dalkit_core::named_enum! {
    #[allow(dead_code)]
    #[derive(Default)]
    pub enum Tier {
        #[default]
        Standard,
        Gold,
        Platinum,
    }
}

dalkit_core::named_enum! {
    #[allow(dead_code)]
    #[derive(Default)]
    pub enum Status {
        #[default]
        Active,
        OnHold,
        Discontinued,
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Customer {
    pub meta: RecordMeta,
    pub name: String,
    pub email: Option<String>,
    pub tier: Tier,
    pub active: bool,
}

impl Record for Customer {
    fn fields() -> FieldTable<Self> {
        FieldTable::<Self>::builder()
            .meta(|c| &c.meta, |c| &mut c.meta)
            .field("Name", |c: &Customer| &c.name, |c: &mut Customer| &mut c.name)
            .field("Email", |c: &Customer| &c.email, |c: &mut Customer| &mut c.email)
            .field("Tier", |c: &Customer| &c.tier, |c: &mut Customer| &mut c.tier)
            .field("Active", |c: &Customer| &c.active, |c: &mut Customer| &mut c.active)
            .build()
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Supplier {
    pub meta: RecordMeta,
    pub name: String,
    pub country: String,
}

impl Record for Supplier {
    fn fields() -> FieldTable<Self> {
        FieldTable::<Self>::builder()
            .meta(|s| &s.meta, |s| &mut s.meta)
            .field("Name", |s: &Supplier| &s.name, |s: &mut Supplier| &mut s.name)
            .field(
                "Country",
                |s: &Supplier| &s.country,
                |s: &mut Supplier| &mut s.country,
            )
            .build()
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}

/// Supplier columns projected onto a product by a join
#[allow(dead_code)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupplierSummary {
    pub name: String,
    pub country: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Product {
    pub meta: RecordMeta,
    pub name: String,
    pub price: f64,
    pub quantity: i32,
    pub status: Status,
    pub released_on: Option<NaiveDate>,
    pub supplier_id: Option<uuid::Uuid>,
    pub supplier: SupplierSummary,
}

impl Record for Product {
    fn fields() -> FieldTable<Self> {
        let summary = FieldTable::<SupplierSummary>::builder()
            .field(
                "Name",
                |s: &SupplierSummary| &s.name,
                |s: &mut SupplierSummary| &mut s.name,
            )
            .field(
                "Country",
                |s: &SupplierSummary| &s.country,
                |s: &mut SupplierSummary| &mut s.country,
            )
            .build();

        FieldTable::<Self>::builder()
            .meta(|p| &p.meta, |p| &mut p.meta)
            .field("Name", |p: &Product| &p.name, |p: &mut Product| &mut p.name)
            .field("Price", |p: &Product| &p.price, |p: &mut Product| &mut p.price)
            .field(
                "Quantity",
                |p: &Product| &p.quantity,
                |p: &mut Product| &mut p.quantity,
            )
            .field("Status", |p: &Product| &p.status, |p: &mut Product| &mut p.status)
            .field(
                "ReleasedOn",
                |p: &Product| &p.released_on,
                |p: &mut Product| &mut p.released_on,
            )
            .field(
                "SupplierId",
                |p: &Product| &p.supplier_id,
                |p: &mut Product| &mut p.supplier_id,
            )
            .nested(
                "Supplier",
                |p| Some(&p.supplier),
                |p| Some(&mut p.supplier),
                summary,
            )
            .build()
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}

/// A customer with a fresh identity
#[allow(dead_code)]
pub fn customer(name: &str) -> Customer {
    Customer {
        meta: RecordMeta::new(),
        name: name.to_string(),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        tier: Tier::Standard,
        active: true,
    }
}

/// A product with a fresh identity; `quantity` doubles as a sequence number
#[allow(dead_code)]
pub fn product(name: &str, quantity: i32) -> Product {
    Product {
        meta: RecordMeta::new(),
        name: name.to_string(),
        price: 2.5,
        quantity,
        ..Product::default()
    }
}

/// In-memory session with the test schema applied
#[allow(dead_code)]
pub fn memory_session() -> UnitOfWork<'static> {
    let session = UnitOfWorkFactory::new(DalConfig::in_memory())
        .create()
        .unwrap();
    session.connection().execute_batch(SCHEMA).unwrap();
    session
}

/// Factory over an on-disk database with the test schema applied
#[allow(dead_code)]
pub fn file_factory(dir: &Path) -> UnitOfWorkFactory {
    let path = dir.join("dalkit-test.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    drop(conn);

    let settings = ConnectionSettings::new(path.to_string_lossy().to_string());
    UnitOfWorkFactory::new(DalConfig::single(settings))
}
