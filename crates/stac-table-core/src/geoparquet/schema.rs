//! Arrow layout of the item table.
//!
//! `assets` is an Arrow map from asset key to `{href, type, roles}` and
//! `links` is a list of `{rel, href, type, asset:keys}` structs, so both keep
//! their nested shape through a Parquet round trip.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryArray, ListArray, ListBuilder, MapArray, StringArray, StringBuilder,
    StructArray, TimestampMicrosecondArray,
};
use arrow::buffer::OffsetBuffer;
use arrow::datatypes::{DataType, Field, FieldRef, Fields, Float64Type, Schema, SchemaRef, TimeUnit};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

use crate::geometry::to_wkb;
use crate::item::{ITEM_TYPE, Item, STAC_VERSION};

/// `type` column.
pub const TYPE_COLUMN: &str = "type";
/// `stac_version` column.
pub const STAC_VERSION_COLUMN: &str = "stac_version";
/// `id` column.
pub const ID_COLUMN: &str = "id";
/// WKB `geometry` column; the GeoParquet primary column.
pub const GEOMETRY_COLUMN: &str = "geometry";
/// `bbox` column.
pub const BBOX_COLUMN: &str = "bbox";
/// `datetime` column.
pub const DATETIME_COLUMN: &str = "datetime";
/// `assets` column.
pub const ASSETS_COLUMN: &str = "assets";
/// `links` column.
pub const LINKS_COLUMN: &str = "links";

/// Timezone attached to the `datetime` column.
pub const DATETIME_TIMEZONE: &str = "UTC";

const LIST_ITEM: &str = "item";

fn string_list_type() -> DataType {
    DataType::List(Arc::new(Field::new(LIST_ITEM, DataType::Utf8, true)))
}

fn asset_fields() -> Fields {
    Fields::from(vec![
        Field::new("href", DataType::Utf8, false),
        Field::new("type", DataType::Utf8, false),
        Field::new("roles", string_list_type(), true),
    ])
}

fn asset_entry_fields() -> Fields {
    Fields::from(vec![
        Field::new("key", DataType::Utf8, false),
        Field::new("value", DataType::Struct(asset_fields()), true),
    ])
}

fn asset_entries_field() -> FieldRef {
    Arc::new(Field::new(
        "entries",
        DataType::Struct(asset_entry_fields()),
        false,
    ))
}

fn link_fields() -> Fields {
    Fields::from(vec![
        Field::new("rel", DataType::Utf8, false),
        Field::new("href", DataType::Utf8, false),
        Field::new("type", DataType::Utf8, true),
        Field::new("asset:keys", string_list_type(), true),
    ])
}

fn link_item_field() -> FieldRef {
    Arc::new(Field::new(
        LIST_ITEM,
        DataType::Struct(link_fields()),
        true,
    ))
}

/// Arrow schema of the item table, in column order.
pub fn item_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(TYPE_COLUMN, DataType::Utf8, false),
        Field::new(STAC_VERSION_COLUMN, DataType::Utf8, false),
        Field::new(ID_COLUMN, DataType::Utf8, false),
        Field::new(GEOMETRY_COLUMN, DataType::Binary, false),
        Field::new(
            BBOX_COLUMN,
            DataType::List(Arc::new(Field::new(LIST_ITEM, DataType::Float64, true))),
            false,
        ),
        Field::new(
            DATETIME_COLUMN,
            DataType::Timestamp(TimeUnit::Microsecond, Some(DATETIME_TIMEZONE.into())),
            false,
        ),
        Field::new(
            ASSETS_COLUMN,
            DataType::Map(asset_entries_field(), false),
            false,
        ),
        Field::new(LINKS_COLUMN, DataType::List(link_item_field()), false),
    ]))
}

fn assets_array(items: &[Item]) -> Result<MapArray, ArrowError> {
    let mut keys = StringBuilder::new();
    let mut hrefs = StringBuilder::new();
    let mut types = StringBuilder::new();
    let mut roles = ListBuilder::new(StringBuilder::new());

    for (key, asset) in items.iter().flat_map(|item| &item.assets) {
        keys.append_value(key);
        hrefs.append_value(&asset.href);
        types.append_value(&asset.media_type);
        for role in &asset.roles {
            roles.values().append_value(role);
        }
        roles.append(true);
    }

    let values = StructArray::try_new(
        asset_fields(),
        vec![
            Arc::new(hrefs.finish()) as ArrayRef,
            Arc::new(types.finish()),
            Arc::new(roles.finish()),
        ],
        None,
    )?;
    let entries = StructArray::try_new(
        asset_entry_fields(),
        vec![Arc::new(keys.finish()) as ArrayRef, Arc::new(values)],
        None,
    )?;

    let offsets = OffsetBuffer::from_lengths(items.iter().map(|item| item.assets.len()));
    MapArray::try_new(asset_entries_field(), offsets, entries, None, false)
}

fn links_array(items: &[Item]) -> Result<ListArray, ArrowError> {
    let mut rels = StringBuilder::new();
    let mut hrefs = StringBuilder::new();
    let mut types = StringBuilder::new();
    let mut asset_keys = ListBuilder::new(StringBuilder::new());

    for link in items.iter().flat_map(|item| &item.links) {
        rels.append_value(&link.rel);
        hrefs.append_value(&link.href);
        types.append_option(link.media_type.as_deref());
        for key in &link.asset_keys {
            asset_keys.values().append_value(key);
        }
        asset_keys.append(true);
    }

    let values = StructArray::try_new(
        link_fields(),
        vec![
            Arc::new(rels.finish()) as ArrayRef,
            Arc::new(hrefs.finish()),
            Arc::new(types.finish()),
            Arc::new(asset_keys.finish()),
        ],
        None,
    )?;

    let offsets = OffsetBuffer::from_lengths(items.iter().map(|item| item.links.len()));
    ListArray::try_new(link_item_field(), offsets, Arc::new(values), None)
}

/// Encode `items` as a single record batch following [`item_schema`].
pub fn items_to_record_batch(items: &[Item]) -> Result<RecordBatch, ArrowError> {
    let n = items.len();

    let kinds = StringArray::from_iter_values(std::iter::repeat_n(ITEM_TYPE, n));
    let versions = StringArray::from_iter_values(std::iter::repeat_n(STAC_VERSION, n));
    let ids = StringArray::from_iter_values(items.iter().map(|item| item.id.as_str()));
    let geometry =
        BinaryArray::from_iter_values(items.iter().map(|item| to_wkb(&item.geometry)));
    let bbox = ListArray::from_iter_primitive::<Float64Type, _, _>(
        items
            .iter()
            .map(|item| Some(item.bbox.to_array().map(Some))),
    );
    let datetime = TimestampMicrosecondArray::from(
        items
            .iter()
            .map(|item| item.datetime.timestamp_micros())
            .collect::<Vec<_>>(),
    )
    .with_timezone(DATETIME_TIMEZONE);

    RecordBatch::try_new(
        item_schema(),
        vec![
            Arc::new(kinds) as ArrayRef,
            Arc::new(versions),
            Arc::new(ids),
            Arc::new(geometry),
            Arc::new(bbox),
            Arc::new(datetime),
            Arc::new(assets_array(items)?),
            Arc::new(links_array(items)?),
        ],
    )
}
