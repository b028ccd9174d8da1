use chrono::NaiveDate;
use dalkit_core::{FieldTable, Record, RecordMeta};

dalkit_core::named_enum! {
    #[derive(Default)]
    pub enum Status {
        #[default]
        Active,
        OnHold,
        Discontinued,
    }
}

/// Nested projection target: only reachable through dotted column aliases
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Supplier {
    pub name: String,
    pub country: String,
}

impl Supplier {
    pub fn fields() -> FieldTable<Self> {
        FieldTable::<Self>::builder()
            .field("Name", |s: &Supplier| &s.name, |s: &mut Supplier| &mut s.name)
            .field(
                "Country",
                |s: &Supplier| &s.country,
                |s: &mut Supplier| &mut s.country,
            )
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Product {
    pub meta: RecordMeta,
    pub name: String,
    pub price: f64,
    pub quantity: i32,
    pub status: Status,
    pub released_on: Option<NaiveDate>,
    pub notes: Option<String>,
    pub supplier: Option<Supplier>,
}

impl Record for Product {
    fn fields() -> FieldTable<Self> {
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
            .field("Notes", |p: &Product| &p.notes, |p: &mut Product| &mut p.notes)
            .read_only("Total", |p: &Product| p.price * f64::from(p.quantity))
            .nested(
                "Supplier",
                |p| p.supplier.as_ref(),
                |p| p.supplier.as_mut(),
                Supplier::fields(),
            )
            .build()
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}

/// A product with a fresh identity and the given name
#[allow(dead_code)]
pub fn product(name: &str) -> Product {
    Product {
        meta: RecordMeta::new(),
        name: name.to_string(),
        price: 9.5,
        quantity: 3,
        ..Product::default()
    }
}

/// A product whose nested supplier exists, so dotted columns can land
#[allow(dead_code)]
pub fn product_with_supplier() -> Product {
    Product {
        supplier: Some(Supplier::default()),
        ..Product::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
}

/// Record whose nested object always exists
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shipment {
    pub meta: RecordMeta,
    pub reference: String,
    pub weight_kg: Option<f64>,
    pub express: bool,
    pub destination: Address,
}

impl Record for Shipment {
    fn fields() -> FieldTable<Self> {
        let address = FieldTable::<Address>::builder()
            .field("Street", |a: &Address| &a.street, |a: &mut Address| &mut a.street)
            .field("City", |a: &Address| &a.city, |a: &mut Address| &mut a.city)
            .build();

        FieldTable::<Self>::builder()
            .meta(|s| &s.meta, |s| &mut s.meta)
            .field(
                "Reference",
                |s: &Shipment| &s.reference,
                |s: &mut Shipment| &mut s.reference,
            )
            .field(
                "WeightKg",
                |s: &Shipment| &s.weight_kg,
                |s: &mut Shipment| &mut s.weight_kg,
            )
            .field("Express", |s: &Shipment| &s.express, |s: &mut Shipment| &mut s.express)
            .nested(
                "Destination",
                |s| Some(&s.destination),
                |s| Some(&mut s.destination),
                address,
            )
            .build()
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}
