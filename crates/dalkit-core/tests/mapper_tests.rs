#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use chrono::NaiveDate;
use common::{product, product_with_supplier, Product, Shipment, Status};
use dalkit_core::{map_parameter, map_row, mapper_for, DalErrorKind, FieldValue, Row, Value};
use uuid::Uuid;

#[test]
fn test_map_row_fills_declared_fields() {
    // Given a row shaped like SELECT * FROM Product
    let id = Uuid::now_v7();
    let row = Row::from_pairs([
        ("Id", id.to_value()),
        ("DateCreated", Value::from("2024-05-01T08:00:00Z")),
        ("DateUpdated", Value::Null),
        ("Name", Value::from("Lamp")),
        ("Price", Value::Real(19.99)),
        ("Quantity", Value::Integer(4)),
        ("Status", Value::from("OnHold")),
        ("ReleasedOn", Value::from("2023-11-20")),
        ("Notes", Value::Null),
    ]);

    // When it is mapped
    let product: Product = map_row(&row).unwrap();

    // Then every non-null column landed in its field
    assert_eq!(product.meta.id, id);
    assert_eq!(product.meta.date_created.to_rfc3339(), "2024-05-01T08:00:00+00:00");
    assert_eq!(product.meta.date_updated, None);
    assert_eq!(product.name, "Lamp");
    assert_eq!(product.price, 19.99);
    assert_eq!(product.quantity, 4);
    assert_eq!(product.status, Status::OnHold);
    assert_eq!(
        product.released_on,
        Some(NaiveDate::from_ymd_opt(2023, 11, 20).unwrap())
    );
    assert_eq!(product.notes, None);
}

#[test]
fn test_column_match_is_case_insensitive() {
    let row = Row::from_pairs([("nAmE", Value::from("Desk")), ("QUANTITY", Value::from("7"))]);

    let product: Product = map_row(&row).unwrap();

    assert_eq!(product.name, "Desk");
    assert_eq!(product.quantity, 7);
}

#[test]
fn test_null_column_keeps_existing_value() {
    // Given a record whose fields are already set
    let mapper = mapper_for::<Product>().unwrap();
    let mut existing = product("Chair");
    let row = Row::from_pairs([("Name", Value::Null), ("Quantity", Value::Integer(12))]);

    // When a row with a null Name is applied
    mapper.apply_row(&mut existing, &row).unwrap();

    // Then Name is untouched and Quantity changed
    assert_eq!(existing.name, "Chair");
    assert_eq!(existing.quantity, 12);
}

#[test]
fn test_null_column_leaves_default() {
    let row = Row::from_pairs([("Price", Value::Null), ("Status", Value::Null)]);

    let product: Product = map_row(&row).unwrap();

    assert_eq!(product.price, 0.0);
    assert_eq!(product.status, Status::Active);
}

#[test]
fn test_unknown_column_is_mapping_error() {
    let row = Row::from_pairs([("Colour", Value::from("red"))]);

    let err = map_row::<Product>(&row).unwrap_err();

    assert_eq!(err.kind(), DalErrorKind::Mapping);
    assert_eq!(err.code(), "ERR_MAPPING");
    assert_eq!(err.column(), Some("Colour"));
    assert_eq!(err.entity(), Some("Product"));
}

#[test]
fn test_read_only_field_is_mapping_error() {
    let row = Row::from_pairs([("Total", Value::Real(3.0))]);

    let err = map_row::<Product>(&row).unwrap_err();

    assert_eq!(err.kind(), DalErrorKind::Mapping);
    assert_eq!(err.column(), Some("Total"));
    assert!(err.message().contains("read-only"));
}

#[test]
fn test_enum_by_member_name() {
    let row = Row::from_pairs([("Status", Value::from("Discontinued"))]);
    let product: Product = map_row(&row).unwrap();
    assert_eq!(product.status, Status::Discontinued);

    let row = Row::from_pairs([("Status", Value::Integer(1))]);
    let product: Product = map_row(&row).unwrap();
    assert_eq!(product.status, Status::OnHold);
}

#[test]
fn test_enum_unknown_name_is_mapping_error() {
    let row = Row::from_pairs([("Status", Value::from("Archived"))]);

    let err = map_row::<Product>(&row).unwrap_err();

    assert_eq!(err.kind(), DalErrorKind::Mapping);
    assert_eq!(err.column(), Some("Status"));
    let source = std::error::Error::source(&err).expect("conversion error kept");
    assert!(source.to_string().contains("Archived"));
}

#[test]
fn test_enum_name_in_other_letter_case_is_mapping_error() {
    // Given a member name that differs from `Discontinued` only in case
    let row = Row::from_pairs([("Status", Value::from("discontinued"))]);

    // When the row is mapped
    let err = map_row::<Product>(&row).unwrap_err();

    // Then the column is rejected rather than matched loosely
    assert_eq!(err.kind(), DalErrorKind::Mapping);
    assert_eq!(err.column(), Some("Status"));
}

#[test]
fn test_coercion_failure_names_column() {
    let row = Row::from_pairs([("Quantity", Value::from("lots"))]);

    let err = map_row::<Product>(&row).unwrap_err();

    assert_eq!(err.kind(), DalErrorKind::Mapping);
    assert_eq!(err.column(), Some("Quantity"));
}

#[test]
fn test_dotted_column_reaches_nested_object() {
    let row = Row::from_pairs([
        ("Reference", Value::from("SHP-1")),
        ("Destination.City", Value::from("Bergen")),
        ("destination.street", Value::from("Bryggen 1")),
        ("Express", Value::Integer(1)),
    ]);

    let shipment: Shipment = map_row(&row).unwrap();

    assert_eq!(shipment.reference, "SHP-1");
    assert_eq!(shipment.destination.city, "Bergen");
    assert_eq!(shipment.destination.street, "Bryggen 1");
    assert!(shipment.express);
}

#[test]
fn test_unset_intermediate_is_mapping_error() {
    // Given a default Product, whose supplier is None
    let row = Row::from_pairs([("Supplier.Name", Value::from("Acme"))]);

    // When a dotted supplier column is mapped
    let err = map_row::<Product>(&row).unwrap_err();

    // Then the missing intermediate is reported against the column
    assert_eq!(err.kind(), DalErrorKind::Mapping);
    assert_eq!(err.column(), Some("Supplier.Name"));
}

#[test]
fn test_existing_intermediate_accepts_dotted_column() {
    let mapper = mapper_for::<Product>().unwrap();
    let mut target = product_with_supplier();
    let row = Row::from_pairs([
        ("Supplier.Name", Value::from("Acme")),
        ("Supplier.Country", Value::from("NO")),
    ]);

    mapper.apply_row(&mut target, &row).unwrap();

    let supplier = target.supplier.unwrap();
    assert_eq!(supplier.name, "Acme");
    assert_eq!(supplier.country, "NO");
}

#[test]
fn test_map_parameter_renders_literals() {
    let mut lamp = product("Bob's lamp");
    lamp.notes = None;
    lamp.status = Status::OnHold;

    assert_eq!(map_parameter(&lamp, "name").unwrap(), "'Bob''s lamp'");
    assert_eq!(map_parameter(&lamp, "Quantity").unwrap(), "3");
    assert_eq!(map_parameter(&lamp, "Price").unwrap(), "9.5");
    assert_eq!(map_parameter(&lamp, "Notes").unwrap(), "NULL");
    assert_eq!(map_parameter(&lamp, "Status").unwrap(), "'OnHold'");
    assert_eq!(map_parameter(&lamp, "Total").unwrap(), "28.5");
    assert_eq!(
        map_parameter(&lamp, "Id").unwrap(),
        format!("'{}'", lamp.meta.id)
    );
}

#[test]
fn test_map_parameter_unknown_field_is_invalid_input() {
    let lamp = product("Lamp");

    let err = map_parameter(&lamp, "Colour").unwrap_err();

    assert_eq!(err.kind(), DalErrorKind::InvalidInput);
    assert_eq!(err.column(), Some("Colour"));
}

#[test]
fn test_map_parameter_through_unset_intermediate() {
    let lamp = product("Lamp");

    let err = map_parameter(&lamp, "Supplier.Name").unwrap_err();

    assert_eq!(err.kind(), DalErrorKind::Mapping);
}

#[test]
fn test_persisted_values_follow_declaration_order() {
    let mapper = mapper_for::<Product>().unwrap();
    let lamp = product("Lamp");

    let values = mapper.persisted_values(&lamp).unwrap();
    let names: Vec<&str> = values.iter().map(|(n, _)| n.as_str()).collect();

    assert_eq!(
        names,
        vec![
            "Id",
            "DateCreated",
            "DateUpdated",
            "Name",
            "Price",
            "Quantity",
            "Status",
            "ReleasedOn",
            "Notes"
        ]
    );
    assert_eq!(values[3].1, Value::from("Lamp"));
    assert_eq!(values[2].1, Value::Null);
}

#[test]
fn test_row_round_trip_through_persisted_values() {
    let mapper = mapper_for::<Product>().unwrap();
    let mut original = product("Shelf");
    original.status = Status::Discontinued;
    original.released_on = NaiveDate::from_ymd_opt(2020, 2, 29);
    original.meta.touch();

    let row = Row::from_pairs(mapper.persisted_values(&original).unwrap());
    let copy = mapper.map_row(&row).unwrap();

    assert_eq!(copy, original);
}
