use crate::table_utils::{CellValue, OptionalField, builders_to_arrays};
use datafusion::arrow::array::{
    Array, BooleanArray, Int32Array, ListArray, StringArray, StructArray,
};
use datafusion::arrow::datatypes::{DataType, Field, Fields};
use std::sync::Arc;

fn int_list_type() -> DataType {
    DataType::List(Arc::new(Field::new("item", DataType::Int32, true)))
}

#[test]
fn test_list_keeps_null_items() {
    let mut builder = OptionalField::new(&int_list_type(), 4).unwrap();
    builder
        .append_cell(Some(&CellValue::Int32List(vec![Some(10), None])))
        .unwrap();
    builder.append_cell(None).unwrap();
    builder.append_cell(Some(&CellValue::Int32(7))).unwrap();

    let array = builder.finish().unwrap();
    let list = array.as_any().downcast_ref::<ListArray>().unwrap();
    assert_eq!(list.len(), 3);

    let first = list.value(0);
    let first = first.as_any().downcast_ref::<Int32Array>().unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first.value(0), 10);
    assert!(first.is_null(1));

    assert!(list.is_null(1));

    let third = list.value(2);
    let third = third.as_any().downcast_ref::<Int32Array>().unwrap();
    assert_eq!(third.values().to_vec(), vec![7]);
}

#[test]
fn test_kind_mismatch_is_rejected() {
    let mut builder = OptionalField::new(&DataType::Int32, 4).unwrap();
    let err = builder
        .append_cell(Some(&CellValue::Utf8("abc".to_string())))
        .unwrap_err();
    assert!(err.to_string().contains("Utf8Builder"));

    let mut flag = OptionalField::new(&DataType::Boolean, 4).unwrap();
    assert!(flag.append_cell(Some(&CellValue::Int32(1))).is_err());
}

#[test]
fn test_struct_null_slot_keeps_children_aligned() {
    let fields = Fields::from(vec![
        Field::new("GT", DataType::Utf8, true),
        Field::new("AD", int_list_type(), true),
    ]);
    let mut builder = OptionalField::new(&DataType::Struct(fields), 4).unwrap();
    builder
        .append_struct(Some(
            [
                Some(CellValue::Utf8("0/1".to_string())),
                Some(CellValue::Int32List(vec![Some(8), Some(7)])),
            ]
            .as_slice(),
        ))
        .unwrap();
    builder.append_struct(None).unwrap();
    builder
        .append_struct(Some(
            [Some(CellValue::Utf8("1/1".to_string())), None].as_slice(),
        ))
        .unwrap();

    let array = builder.finish().unwrap();
    let structs = array.as_any().downcast_ref::<StructArray>().unwrap();
    assert_eq!(structs.len(), 3);
    assert!(structs.is_valid(0));
    assert!(structs.is_null(1));
    assert!(structs.is_valid(2));

    let gt = structs
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(gt.len(), 3);
    assert_eq!(gt.value(2), "1/1");

    let ad = structs
        .column(1)
        .as_any()
        .downcast_ref::<ListArray>()
        .unwrap();
    assert!(ad.is_null(2));
}

#[test]
fn test_struct_rejects_wrong_width() {
    let fields = Fields::from(vec![Field::new("DP", DataType::Int32, true)]);
    let mut builder = OptionalField::new(&DataType::Struct(fields), 1).unwrap();
    assert!(builder.append_struct(Some([None, None].as_slice())).is_err());
}

#[test]
fn test_list_of_structs() {
    let item = Field::new(
        "item",
        DataType::Struct(Fields::from(vec![
            Field::new("Allele", DataType::Utf8, true),
            Field::new("DISTANCE", DataType::Int32, true),
        ])),
        true,
    );
    let mut builder = OptionalField::new(&DataType::List(Arc::new(item)), 2).unwrap();
    builder
        .append_struct_list(Some(
            [
                vec![Some(CellValue::Utf8("A".to_string())), Some(CellValue::Int32(5))],
                vec![Some(CellValue::Utf8("T".to_string())), None],
            ]
            .as_slice(),
        ))
        .unwrap();
    builder.append_struct_list(None).unwrap();

    let array = builder.finish().unwrap();
    let list = array.as_any().downcast_ref::<ListArray>().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list.value_length(0), 2);
    assert!(list.is_null(1));

    let first = list.value(0);
    let items = first.as_any().downcast_ref::<StructArray>().unwrap();
    let distance = items
        .column(1)
        .as_any()
        .downcast_ref::<Int32Array>()
        .unwrap();
    assert_eq!(distance.value(0), 5);
    assert!(distance.is_null(1));
}

#[test]
fn test_builders_reset_after_finish() {
    let mut builders = vec![
        OptionalField::new(&DataType::Boolean, 2).unwrap(),
        OptionalField::new(&DataType::Utf8, 2).unwrap(),
    ];
    builders[0].append_boolean(true).unwrap();
    builders[1].append_string("x").unwrap();

    let arrays = builders_to_arrays(&mut builders).unwrap();
    let flags = arrays[0].as_any().downcast_ref::<BooleanArray>().unwrap();
    assert!(flags.value(0));

    let arrays = builders_to_arrays(&mut builders).unwrap();
    assert_eq!(arrays[0].len(), 0);
    assert_eq!(arrays[1].len(), 0);
}
