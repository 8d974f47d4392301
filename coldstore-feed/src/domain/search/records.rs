//! Typed records per resource kind and their normalization from backend JSON.
//!
//! Normalization never fails: a missing or mistyped field falls back to [`UNKNOWN`], zero or
//! the Unix epoch, so one bad field degrades one record instead of the whole feed.

use serde::Serialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::types::{DomainActivity, DomainId, ResourceKind};

/// Sentinel for missing text fields.
pub const UNKNOWN: &str = "unknown";

const ID_KEYS: &[&str] = &["id", "_id"];
const CREATED_KEYS: &[&str] = &["createdAt", "created_at", "date", "updatedAt"];
const STATUS_KEYS: &[&str] = &["status", "state"];

/// Lenient read access to one backend record.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a>(&'a Value);

impl<'a> RawRecord<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self(value)
    }

    /// Resolve a dotted path such as `vendor.name`.
    fn lookup(&self, path: &str) -> Option<&'a Value> {
        path.split('.')
            .try_fold(self.0, |value, segment| value.get(segment))
            .filter(|value| !value.is_null())
    }

    /// First key holding a non-empty string, number or bool, rendered as text.
    pub fn text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| match self.lookup(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    pub fn text_or_unknown(&self, keys: &[&str]) -> String {
        self.text(keys).unwrap_or_else(|| UNKNOWN.to_string())
    }

    /// First key holding a number (or a numeric string); zero otherwise.
    pub fn number(&self, keys: &[&str]) -> f64 {
        keys.iter()
            .find_map(|key| match self.lookup(key)? {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .unwrap_or(0.0)
    }

    pub fn flag(&self, keys: &[&str]) -> bool {
        keys.iter()
            .find_map(|key| self.lookup(key)?.as_bool())
            .unwrap_or(false)
    }

    /// RFC 3339 string or Unix milliseconds; the epoch otherwise.
    pub fn timestamp(&self, keys: &[&str]) -> OffsetDateTime {
        keys.iter()
            .find_map(|key| match self.lookup(key)? {
                Value::String(s) => OffsetDateTime::parse(s.trim(), &Rfc3339)
                    .ok()
                    .or_else(|| s.trim().parse::<i64>().ok().and_then(from_millis)),
                Value::Number(n) => n.as_i64().and_then(from_millis),
                _ => None,
            })
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    pub fn id(&self) -> Option<String> {
        self.text(ID_KEYS)
    }

    /// Lower-cased status, [`UNKNOWN`] when absent.
    pub fn status(&self) -> String {
        self.text_or_unknown(STATUS_KEYS).to_lowercase()
    }
}

fn from_millis(millis: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMaterialOrder {
    pub material: String,
    pub vendor_name: String,
    pub quantity: f64,
    pub unit: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionBatch {
    pub product: String,
    pub lane: String,
    pub supervisor: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOrder {
    pub customer: String,
    pub destination: String,
    pub truck_number: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub name: String,
    pub contact_name: String,
    pub phone: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Truck {
    pub number: String,
    pub driver_name: String,
    pub transporter: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackingEvent {
    pub product: String,
    pub package_type: String,
    pub quantity: f64,
    pub packed_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageStock {
    pub package_type: String,
    pub quantity: f64,
    pub chamber: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub title: String,
    pub message: String,
    pub kind: String,
    pub read: bool,
}

/// Record payload, one variant per resource kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "resource", rename_all = "kebab-case")]
pub enum ActivityRecord {
    RawMaterialOrder(RawMaterialOrder),
    ProductionBatch(ProductionBatch),
    DispatchOrder(DispatchOrder),
    Vendor(Vendor),
    Truck(Truck),
    PackingEvent(PackingEvent),
    PackageStock(PackageStock),
    Notification(NotificationRecord),
}

impl ActivityRecord {
    pub fn resource(&self) -> ResourceKind {
        match self {
            ActivityRecord::RawMaterialOrder(_) => ResourceKind::RawMaterialOrder,
            ActivityRecord::ProductionBatch(_) => ResourceKind::ProductionBatch,
            ActivityRecord::DispatchOrder(_) => ResourceKind::DispatchOrder,
            ActivityRecord::Vendor(_) => ResourceKind::Vendor,
            ActivityRecord::Truck(_) => ResourceKind::Truck,
            ActivityRecord::PackingEvent(_) => ResourceKind::PackingEvent,
            ActivityRecord::PackageStock(_) => ResourceKind::PackageStock,
            ActivityRecord::Notification(_) => ResourceKind::Notification,
        }
    }

    /// Headline shown for the record.
    pub fn title(&self) -> &str {
        match self {
            ActivityRecord::RawMaterialOrder(r) => &r.material,
            ActivityRecord::ProductionBatch(r) => &r.product,
            ActivityRecord::DispatchOrder(r) => &r.customer,
            ActivityRecord::Vendor(r) => &r.name,
            ActivityRecord::Truck(r) => &r.number,
            ActivityRecord::PackingEvent(r) => &r.product,
            ActivityRecord::PackageStock(r) => &r.package_type,
            ActivityRecord::Notification(r) => &r.title,
        }
    }

    /// Secondary human-visible fields: names, places, statuses.
    pub fn details(&self) -> Vec<&str> {
        match self {
            ActivityRecord::RawMaterialOrder(r) => vec![&r.vendor_name, &r.unit, &r.status],
            ActivityRecord::ProductionBatch(r) => vec![&r.lane, &r.supervisor, &r.status],
            ActivityRecord::DispatchOrder(r) => {
                vec![&r.destination, &r.truck_number, &r.status]
            }
            ActivityRecord::Vendor(r) => vec![&r.contact_name, &r.phone, &r.city],
            ActivityRecord::Truck(r) => vec![&r.driver_name, &r.transporter, &r.status],
            ActivityRecord::PackingEvent(r) => vec![&r.package_type, &r.packed_by],
            ActivityRecord::PackageStock(r) => vec![&r.chamber],
            ActivityRecord::Notification(r) => vec![&r.message, &r.kind],
        }
    }

    pub fn status(&self) -> Option<&str> {
        match self {
            ActivityRecord::RawMaterialOrder(r) => Some(&r.status),
            ActivityRecord::ProductionBatch(r) => Some(&r.status),
            ActivityRecord::DispatchOrder(r) => Some(&r.status),
            ActivityRecord::Truck(r) => Some(&r.status),
            ActivityRecord::Vendor(_)
            | ActivityRecord::PackingEvent(_)
            | ActivityRecord::PackageStock(_)
            | ActivityRecord::Notification(_) => None,
        }
    }
}

fn raw_material_order(raw: RawRecord<'_>) -> ActivityRecord {
    ActivityRecord::RawMaterialOrder(RawMaterialOrder {
        material: raw.text_or_unknown(&["materialName", "material.name", "material", "title"]),
        vendor_name: raw.text_or_unknown(&["vendorName", "vendor.name", "vendor"]),
        quantity: raw.number(&["quantity", "qty"]),
        unit: raw.text_or_unknown(&["unit"]),
        status: raw.status(),
    })
}

fn production_batch(raw: RawRecord<'_>) -> ActivityRecord {
    ActivityRecord::ProductionBatch(ProductionBatch {
        product: raw.text_or_unknown(&["productName", "product.name", "product", "title"]),
        lane: raw.text_or_unknown(&["laneName", "lane.name", "lane"]),
        supervisor: raw.text_or_unknown(&["supervisorName", "supervisor.name", "supervisor"]),
        status: raw.status(),
    })
}

fn dispatch_order(raw: RawRecord<'_>) -> ActivityRecord {
    ActivityRecord::DispatchOrder(DispatchOrder {
        customer: raw.text_or_unknown(&["customerName", "customer.name", "customer", "title"]),
        destination: raw.text_or_unknown(&["destination", "city"]),
        truck_number: raw.text_or_unknown(&["truckNumber", "truck.number", "truck"]),
        status: raw.status(),
    })
}

fn vendor(raw: RawRecord<'_>) -> ActivityRecord {
    ActivityRecord::Vendor(Vendor {
        name: raw.text_or_unknown(&["name", "vendorName", "companyName"]),
        contact_name: raw.text_or_unknown(&["contactName", "contact.name", "contactPerson"]),
        phone: raw.text_or_unknown(&["phone", "contact.phone", "mobile"]),
        city: raw.text_or_unknown(&["city", "address.city"]),
    })
}

fn truck(raw: RawRecord<'_>) -> ActivityRecord {
    ActivityRecord::Truck(Truck {
        number: raw.text_or_unknown(&["truckNumber", "number", "registration"]),
        driver_name: raw.text_or_unknown(&["driverName", "driver.name", "driver"]),
        transporter: raw.text_or_unknown(&["transporter", "transporterName", "agency"]),
        status: raw.status(),
    })
}

fn packing_event(raw: RawRecord<'_>) -> ActivityRecord {
    ActivityRecord::PackingEvent(PackingEvent {
        product: raw.text_or_unknown(&["productName", "product.name", "product"]),
        package_type: raw.text_or_unknown(&["packageType", "package.type", "package"]),
        quantity: raw.number(&["quantity", "count"]),
        packed_by: raw.text_or_unknown(&["packedBy", "worker.name", "labourName"]),
    })
}

fn package_stock(raw: RawRecord<'_>) -> ActivityRecord {
    ActivityRecord::PackageStock(PackageStock {
        package_type: raw.text_or_unknown(&["packageType", "type", "name"]),
        quantity: raw.number(&["quantity", "stock", "available"]),
        chamber: raw.text_or_unknown(&["chamber", "chamberName", "chamber.name"]),
    })
}

fn notification(raw: RawRecord<'_>) -> ActivityRecord {
    ActivityRecord::Notification(NotificationRecord {
        title: raw.text_or_unknown(&["title"]),
        message: raw.text_or_unknown(&["message", "body"]),
        kind: raw.text_or_unknown(&["type", "kind"]),
        read: raw.flag(&["read"]),
    })
}

/// Normalize one backend record for `domain`. `index` names records that carry no id.
pub fn normalize(domain: DomainId, index: usize, value: &Value) -> DomainActivity {
    let raw = RawRecord::new(value);
    let record = match domain.resource() {
        ResourceKind::RawMaterialOrder => raw_material_order(raw),
        ResourceKind::ProductionBatch => production_batch(raw),
        ResourceKind::DispatchOrder => dispatch_order(raw),
        ResourceKind::Vendor => vendor(raw),
        ResourceKind::Truck => truck(raw),
        ResourceKind::PackingEvent => packing_event(raw),
        ResourceKind::PackageStock => package_stock(raw),
        ResourceKind::Notification => notification(raw),
    };

    DomainActivity {
        id: raw.id().unwrap_or_else(|| format!("{}-{}", domain, index)),
        domain,
        created_at: raw.timestamp(CREATED_KEYS),
        record,
    }
}
