/* HID report descriptor parser: walks the short items of a descriptor, tracks global/local parser
 * state and builds the collection list plus per-(type, id) report layouts used for encoding. */
use std::collections::BTreeMap;

use thiserror::Error;

/* Item types (bits 2-3 of the prefix byte) */
const ITEM_TYPE_MAIN: u8 = 0;
const ITEM_TYPE_GLOBAL: u8 = 1;
const ITEM_TYPE_LOCAL: u8 = 2;

/* Long items carry this prefix and are skipped. */
const ITEM_LONG_PREFIX: u8 = 0xfe;

/* Main item tags */
const MAIN_INPUT: u8 = 0x8;
const MAIN_OUTPUT: u8 = 0x9;
const MAIN_COLLECTION: u8 = 0xa;
const MAIN_FEATURE: u8 = 0xb;
const MAIN_END_COLLECTION: u8 = 0xc;

/* Global item tags */
const GLOBAL_USAGE_PAGE: u8 = 0x0;
const GLOBAL_LOGICAL_MINIMUM: u8 = 0x1;
const GLOBAL_LOGICAL_MAXIMUM: u8 = 0x2;
const GLOBAL_REPORT_SIZE: u8 = 0x7;
const GLOBAL_REPORT_ID: u8 = 0x8;
const GLOBAL_REPORT_COUNT: u8 = 0x9;
const GLOBAL_PUSH: u8 = 0xa;
const GLOBAL_POP: u8 = 0xb;

/* Local item tags */
const LOCAL_USAGE: u8 = 0x0;
const LOCAL_USAGE_MINIMUM: u8 = 0x1;
const LOCAL_USAGE_MAXIMUM: u8 = 0x2;

/* Parser limits, same ceilings the kernel HID core enforces. */
const MAX_REPORT_SIZE_BITS: u32 = 256;
const MAX_REPORT_COUNT: u32 = 12288;
const MAX_GLOBAL_STACK: usize = 4;

/* HID_MAX_BUFFER_SIZE: a report plus its id byte never exceeds 16 KiB. */
const MAX_BUFFER_SIZE: u32 = 16384;
const MAX_REPORT_BITS: u32 = (MAX_BUFFER_SIZE - 1) * 8;

/* Errors raised while walking a malformed descriptor. */
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("Item at offset {offset} is truncated")]
    Truncated { offset: usize },

    #[error("End Collection without open collection at offset {offset}")]
    UnbalancedCollection { offset: usize },

    #[error("Global item stack {0} at offset {1}")]
    GlobalStack(&'static str, usize),

    #[error("Invalid report id 0 at offset {offset}")]
    InvalidReportId { offset: usize },

    #[error("Report size {size} x count {count} out of range at offset {offset}")]
    InvalidReportLayout { size: u32, count: u32, offset: usize },
}

/* The three HID report directions. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportType {
    Input,
    Output,
    Feature,
}

/* One `Collection` main item with its full (page << 16 | id) usage. */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub usage: u32,
}

/* One data field of a report. Padding items never become fields. */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /* Bit offset of the first value, not counting the report id byte */
    pub report_offset: u32,
    pub report_size: u32,
    pub logical_maximum: i32,
}

/* A report layout: ordered fields and the total payload size in bits. */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    kind: ReportType,
    id: u8,
    fields: Vec<Field>,
    size_bits: u32,
}

impl Report {
    fn new(kind: ReportType, id: u8) -> Self {
        Self {
            kind,
            id,
            fields: Vec::new(),
            size_bits: 0,
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /* Length on the wire including the leading report id byte. */
    /*                                                           */
    /* hidraw always expects the id byte, even for unnumbered   */
    /* reports where it is 0.                                    */
    pub fn len(&self) -> usize {
        1 + self.size_bits.div_ceil(8) as usize
    }

    /* Encode one value per field into `out`.                       */
    /*                                                              */
    /* `values[i]` becomes the first value of field `i`; remaining  */
    /* values of a multi-count field and fields past the end of     */
    /* `values` are sent as zero. Each value is truncated to the    */
    /* field's report size and packed LSB first at its bit offset.  */
    pub fn encode(&self, values: &[i32], out: &mut Vec<u8>) {
        out.clear();
        out.resize(self.len(), 0);
        out[0] = self.id;

        for (field, value) in self.fields.iter().zip(values) {
            implement(&mut out[1..], field.report_offset, field.report_size, *value as u32);
        }
    }
}

/* Write the low `size` bits of `value` at bit `offset` of `buf`. */
fn implement(buf: &mut [u8], offset: u32, size: u32, value: u32) {
    for bit in 0..size.min(32) {
        if (value >> bit) & 1 == 0 {
            continue;
        }
        let pos = (offset + bit) as usize;
        if let Some(byte) = buf.get_mut(pos / 8) {
            *byte |= 1 << (pos % 8);
        }
    }
}

/* Parsed report descriptor. */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportDescriptor {
    collections: Vec<Collection>,
    reports: BTreeMap<(ReportType, u8), Report>,
}

#[derive(Debug, Clone, Copy, Default)]
struct GlobalState {
    usage_page: u32,
    logical_minimum: i32,
    logical_maximum: i32,
    report_size: u32,
    report_count: u32,
    report_id: u8,
}

/* Only the first usage matters: it names a collection and marks a main */
/* item as data rather than padding.                                     */
#[derive(Debug, Default)]
struct LocalState {
    first_usage: Option<u32>,
    usage_minimum: Option<u32>,
}

impl LocalState {
    fn push_usage(&mut self, usage: u32) {
        self.first_usage.get_or_insert(usage);
    }
}

/* Extend a short usage with the current usage page. */
fn full_usage(global: &GlobalState, data: u32, size: usize) -> u32 {
    if size <= 2 {
        (global.usage_page << 16) | data
    } else {
        data
    }
}

fn item_udata(data: &[u8]) -> u32 {
    data.iter()
        .enumerate()
        .fold(0u32, |acc, (i, b)| acc | (u32::from(*b) << (8 * i)))
}

fn item_sdata(data: &[u8]) -> i32 {
    match data.len() {
        0 => 0,
        1 => i32::from(data[0] as i8),
        2 => i32::from(i16::from_le_bytes([data[0], data[1]])),
        _ => item_udata(data) as i32,
    }
}

impl ReportDescriptor {
    /* Parse a raw report descriptor as read from sysfs. */
    pub fn parse(bytes: &[u8]) -> Result<Self, DescriptorError> {
        let mut desc = ReportDescriptor::default();
        let mut global = GlobalState::default();
        let mut global_stack: Vec<GlobalState> = Vec::new();
        let mut local = LocalState::default();
        let mut level = 0usize;
        let mut pos = 0usize;

        while pos < bytes.len() {
            let offset = pos;
            let prefix = bytes[pos];
            pos += 1;

            if prefix == ITEM_LONG_PREFIX {
                let size = *bytes.get(pos).ok_or(DescriptorError::Truncated { offset })? as usize;
                pos += 2 + size;
                if pos > bytes.len() {
                    return Err(DescriptorError::Truncated { offset });
                }
                continue;
            }

            let size = match prefix & 0x03 {
                3 => 4,
                n => n as usize,
            };
            let item_type = (prefix >> 2) & 0x03;
            let tag = prefix >> 4;

            let data = bytes
                .get(pos..pos + size)
                .ok_or(DescriptorError::Truncated { offset })?;
            pos += size;

            match item_type {
                ITEM_TYPE_MAIN => {
                    match tag {
                        MAIN_COLLECTION => {
                            desc.collections.push(Collection {
                                usage: local.first_usage.unwrap_or(0),
                            });
                            level += 1;
                        }
                        MAIN_END_COLLECTION => {
                            if level == 0 {
                                return Err(DescriptorError::UnbalancedCollection { offset });
                            }
                            level -= 1;
                        }
                        MAIN_INPUT | MAIN_OUTPUT | MAIN_FEATURE => {
                            let kind = match tag {
                                MAIN_INPUT => ReportType::Input,
                                MAIN_OUTPUT => ReportType::Output,
                                _ => ReportType::Feature,
                            };
                            desc.add_field(kind, &global, &local, offset)?;
                        }
                        _ => {}
                    }
                    local = LocalState::default();
                }
                ITEM_TYPE_GLOBAL => match tag {
                    GLOBAL_USAGE_PAGE => global.usage_page = item_udata(data),
                    GLOBAL_LOGICAL_MINIMUM => global.logical_minimum = item_sdata(data),
                    GLOBAL_LOGICAL_MAXIMUM => {
                        /* Signed only when the minimum is negative */
                        global.logical_maximum = if global.logical_minimum < 0 {
                            item_sdata(data)
                        } else {
                            item_udata(data) as i32
                        };
                    }
                    GLOBAL_REPORT_SIZE => {
                        global.report_size = item_udata(data);
                        if global.report_size > MAX_REPORT_SIZE_BITS {
                            return Err(DescriptorError::InvalidReportLayout {
                                size: global.report_size,
                                count: global.report_count,
                                offset,
                            });
                        }
                    }
                    GLOBAL_REPORT_COUNT => {
                        global.report_count = item_udata(data);
                        if global.report_count > MAX_REPORT_COUNT {
                            return Err(DescriptorError::InvalidReportLayout {
                                size: global.report_size,
                                count: global.report_count,
                                offset,
                            });
                        }
                    }
                    GLOBAL_REPORT_ID => {
                        let id = item_udata(data);
                        if id == 0 || id > u32::from(u8::MAX) {
                            return Err(DescriptorError::InvalidReportId { offset });
                        }
                        global.report_id = id as u8;
                    }
                    GLOBAL_PUSH => {
                        if global_stack.len() >= MAX_GLOBAL_STACK {
                            return Err(DescriptorError::GlobalStack("overflow", offset));
                        }
                        global_stack.push(global);
                    }
                    GLOBAL_POP => {
                        global = global_stack
                            .pop()
                            .ok_or(DescriptorError::GlobalStack("underflow", offset))?;
                    }
                    /* Physical range, units and exponents do not affect layout */
                    _ => {}
                },
                ITEM_TYPE_LOCAL => {
                    let udata = item_udata(data);
                    match tag {
                        LOCAL_USAGE => local.push_usage(full_usage(&global, udata, size)),
                        LOCAL_USAGE_MINIMUM => {
                            local.usage_minimum = Some(full_usage(&global, udata, size));
                        }
                        LOCAL_USAGE_MAXIMUM => {
                            let maximum = full_usage(&global, udata, size);
                            if let Some(minimum) = local.usage_minimum.filter(|m| *m <= maximum) {
                                local.push_usage(minimum);
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        Ok(desc)
    }

    fn add_field(
        &mut self,
        kind: ReportType,
        global: &GlobalState,
        local: &LocalState,
        offset: usize,
    ) -> Result<(), DescriptorError> {
        let report = self
            .reports
            .entry((kind, global.report_id))
            .or_insert_with(|| Report::new(kind, global.report_id));

        let report_offset = report.size_bits;
        report.size_bits = global
            .report_size
            .checked_mul(global.report_count)
            .and_then(|bits| bits.checked_add(report_offset))
            .filter(|bits| *bits <= MAX_REPORT_BITS)
            .ok_or(DescriptorError::InvalidReportLayout {
                size: global.report_size,
                count: global.report_count,
                offset,
            })?;

        /* Padding: advances the offset but carries no data */
        if local.first_usage.is_none() || global.report_count == 0 {
            return Ok(());
        }

        report.fields.push(Field {
            report_offset,
            report_size: global.report_size,
            logical_maximum: global.logical_maximum,
        });
        Ok(())
    }

    /* Collections in declaration order; index 0 is the outermost first one. */
    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn report(&self, kind: ReportType, id: u8) -> Option<&Report> {
        self.reports.get(&(kind, id))
    }

    /* Wire length of the largest report of the given type, 0 if none. */
    pub fn max_report_len(&self, kind: ReportType) -> usize {
        self.reports
            .values()
            .filter(|r| r.kind == kind)
            .map(Report::len)
            .max()
            .unwrap_or(0)
    }
}

/* Descriptor of the T2 keyboard backlight interface: a vendor collection with */
/* brightness (id 1) and power (id 3) feature reports, each holding a value     */
/* byte followed by a 16-bit control word.                                      */
#[cfg(test)]
#[rustfmt::skip]
pub(crate) const KBD_BACKLIGHT_DESCRIPTOR: &[u8] = &[
    0x06, 0x00, 0xff,             // Usage Page (Vendor 0xFF00)
    0x09, 0x0f,                   // Usage (0x0F)
    0xa1, 0x01,                   // Collection (Application)
    0x85, 0x01,                   //   Report ID (1)
    0x09, 0x01,                   //   Usage (0x01)
    0x15, 0x00,                   //   Logical Minimum (0)
    0x26, 0xff, 0x00,             //   Logical Maximum (255)
    0x75, 0x08,                   //   Report Size (8)
    0x95, 0x01,                   //   Report Count (1)
    0xb1, 0x02,                   //   Feature (Data,Var,Abs)
    0x09, 0x02,                   //   Usage (0x02)
    0x27, 0xff, 0xff, 0x00, 0x00, //   Logical Maximum (65535)
    0x75, 0x10,                   //   Report Size (16)
    0xb1, 0x02,                   //   Feature (Data,Var,Abs)
    0x85, 0x03,                   //   Report ID (3)
    0x09, 0x03,                   //   Usage (0x03)
    0x25, 0x01,                   //   Logical Maximum (1)
    0x75, 0x08,                   //   Report Size (8)
    0xb1, 0x02,                   //   Feature (Data,Var,Abs)
    0x09, 0x04,                   //   Usage (0x04)
    0x27, 0xff, 0xff, 0x00, 0x00, //   Logical Maximum (65535)
    0x75, 0x10,                   //   Report Size (16)
    0xb1, 0x02,                   //   Feature (Data,Var,Abs)
    0xc0,                         // End Collection
];

/* Sibling touch bar backlight interface: same reports, different usage. */
#[cfg(test)]
#[rustfmt::skip]
pub(crate) const TOUCHBAR_BACKLIGHT_DESCRIPTOR: &[u8] = &[
    0x06, 0x00, 0xff,             // Usage Page (Vendor 0xFF00)
    0x09, 0x0d,                   // Usage (0x0D)
    0xa1, 0x01,                   // Collection (Application)
    0x85, 0x01,                   //   Report ID (1)
    0x09, 0x01,                   //   Usage (0x01)
    0x15, 0x00,                   //   Logical Minimum (0)
    0x26, 0xff, 0x00,             //   Logical Maximum (255)
    0x75, 0x08,                   //   Report Size (8)
    0x95, 0x01,                   //   Report Count (1)
    0xb1, 0x02,                   //   Feature (Data,Var,Abs)
    0xc0,                         // End Collection
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collection_usage_includes_page() {
        let desc = ReportDescriptor::parse(KBD_BACKLIGHT_DESCRIPTOR).unwrap();
        assert_eq!(desc.collections().len(), 1);
        assert_eq!(desc.collections()[0].usage, 0xff00000f);
    }

    #[test]
    fn test_parse_feature_reports() {
        let desc = ReportDescriptor::parse(KBD_BACKLIGHT_DESCRIPTOR).unwrap();

        let brightness = desc.report(ReportType::Feature, 1).unwrap();
        assert_eq!(brightness.fields().len(), 2);
        assert_eq!(brightness.field(0).unwrap().logical_maximum, 255);
        assert_eq!(brightness.field(0).unwrap().report_offset, 0);
        assert_eq!(brightness.field(1).unwrap().report_offset, 8);
        assert_eq!(brightness.field(1).unwrap().report_size, 16);
        assert_eq!(brightness.len(), 4);

        let power = desc.report(ReportType::Feature, 3).unwrap();
        assert_eq!(power.field(0).unwrap().logical_maximum, 1);
        assert_eq!(power.field(1).unwrap().report_size, 16);

        assert!(desc.report(ReportType::Feature, 2).is_none());
        assert!(desc.report(ReportType::Input, 1).is_none());
        assert_eq!(desc.max_report_len(ReportType::Feature), 4);
        assert_eq!(desc.max_report_len(ReportType::Input), 0);
    }

    #[test]
    fn test_parse_sibling_interface_usage() {
        let desc = ReportDescriptor::parse(TOUCHBAR_BACKLIGHT_DESCRIPTOR).unwrap();
        assert_eq!(desc.collections()[0].usage, 0xff00000d);
    }

    #[test]
    fn test_padding_advances_offset_without_field() {
        #[rustfmt::skip]
        let bytes = [
            0x85, 0x02,       // Report ID (2)
            0x75, 0x04,       // Report Size (4)
            0x95, 0x01,       // Report Count (1)
            0xb1, 0x03,       // Feature (Const) - padding
            0x09, 0x01,       // Usage (0x01)
            0x75, 0x04,       // Report Size (4)
            0xb1, 0x02,       // Feature (Data,Var,Abs)
        ];
        let desc = ReportDescriptor::parse(&bytes).unwrap();
        let report = desc.report(ReportType::Feature, 2).unwrap();
        assert_eq!(report.fields().len(), 1);
        assert_eq!(report.field(0).unwrap().report_offset, 4);
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_logical_maximum_signed_when_minimum_negative() {
        #[rustfmt::skip]
        let bytes = [
            0x09, 0x01,       // Usage (0x01)
            0x15, 0x81,       // Logical Minimum (-127)
            0x25, 0x7f,       // Logical Maximum (127)
            0x75, 0x08,       // Report Size (8)
            0x95, 0x01,       // Report Count (1)
            0x81, 0x02,       // Input (Data,Var,Abs)
            0x09, 0x02,       // Usage (0x02)
            0x15, 0x00,       // Logical Minimum (0)
            0x25, 0xff,       // Logical Maximum (255)
            0x81, 0x02,       // Input (Data,Var,Abs)
        ];
        let desc = ReportDescriptor::parse(&bytes).unwrap();
        let report = desc.report(ReportType::Input, 0).unwrap();
        assert_eq!(report.field(0).unwrap().logical_maximum, 127);
        assert_eq!(report.field(1).unwrap().logical_maximum, 255);
    }

    #[test]
    fn test_usage_range_marks_data_field() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x07,       // Usage Page (Keyboard)
            0x19, 0xe0,       // Usage Minimum (0xE0)
            0x29, 0xe7,       // Usage Maximum (0xE7)
            0x75, 0x01,       // Report Size (1)
            0x95, 0x08,       // Report Count (8)
            0x81, 0x02,       // Input (Data,Var,Abs)
        ];
        let desc = ReportDescriptor::parse(&bytes).unwrap();
        let report = desc.report(ReportType::Input, 0).unwrap();
        assert_eq!(report.fields().len(), 1);
        assert_eq!(report.field(0).unwrap().report_size, 1);
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_usage_range_names_collection() {
        #[rustfmt::skip]
        let bytes = [
            0x06, 0x00, 0xff, // Usage Page (Vendor 0xFF00)
            0x19, 0x0f,       // Usage Minimum (0x0F)
            0x29, 0x10,       // Usage Maximum (0x10)
            0xa1, 0x01,       // Collection (Application)
            0xc0,             // End Collection
        ];
        let desc = ReportDescriptor::parse(&bytes).unwrap();
        assert_eq!(desc.collections()[0].usage, 0xff00000f);
    }

    #[test]
    fn test_push_pop_restores_globals() {
        #[rustfmt::skip]
        let bytes = [
            0x75, 0x08,       // Report Size (8)
            0x95, 0x01,       // Report Count (1)
            0xa4,             // Push
            0x75, 0x10,       // Report Size (16)
            0xb4,             // Pop
            0x09, 0x01,       // Usage (0x01)
            0xb1, 0x02,       // Feature (Data,Var,Abs)
        ];
        let desc = ReportDescriptor::parse(&bytes).unwrap();
        let field = desc.report(ReportType::Feature, 0).unwrap().field(0).unwrap();
        assert_eq!(field.report_size, 8);
    }

    #[test]
    fn test_long_item_skipped() {
        let bytes = [0xfe, 0x02, 0x10, 0xaa, 0xbb, 0x09, 0x01, 0xa1, 0x01, 0xc0];
        let desc = ReportDescriptor::parse(&bytes).unwrap();
        assert_eq!(desc.collections().len(), 1);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            ReportDescriptor::parse(&[0x26, 0xff]),
            Err(DescriptorError::Truncated { offset: 0 })
        );
        assert_eq!(
            ReportDescriptor::parse(&[0x09, 0x01, 0xc0]),
            Err(DescriptorError::UnbalancedCollection { offset: 2 })
        );
        assert_eq!(
            ReportDescriptor::parse(&[0xb4]),
            Err(DescriptorError::GlobalStack("underflow", 0))
        );
        assert_eq!(
            ReportDescriptor::parse(&[0x85, 0x00]),
            Err(DescriptorError::InvalidReportId { offset: 0 })
        );
        assert!(matches!(
            ReportDescriptor::parse(&[0x76, 0x01, 0x01]),
            Err(DescriptorError::InvalidReportLayout { size: 257, .. })
        ));
    }

    #[test]
    fn test_oversized_field_rejected() {
        #[rustfmt::skip]
        let bytes = [
            0x76, 0x00, 0x01, // Report Size (256)
            0x96, 0x00, 0x30, // Report Count (12288)
            0x09, 0x01,       // Usage (0x01)
            0xb1, 0x02,       // Feature (Data,Var,Abs)
        ];
        assert_eq!(
            ReportDescriptor::parse(&bytes),
            Err(DescriptorError::InvalidReportLayout { size: 256, count: 12288, offset: 8 })
        );
    }

    #[test]
    fn test_report_length_capped_across_items() {
        /* Each item fits on its own; together they pass the 16 KiB buffer */
        let mut bytes = vec![0x75, 0x08, 0x96, 0x00, 0x20, 0x09, 0x01];
        let item = bytes.len();
        bytes.extend_from_slice(&[0xb1, 0x02]);
        assert_eq!(
            ReportDescriptor::parse(&bytes).unwrap().max_report_len(ReportType::Feature),
            8193
        );

        bytes.extend_from_slice(&[0xb1, 0x02]);
        assert_eq!(
            ReportDescriptor::parse(&bytes),
            Err(DescriptorError::InvalidReportLayout { size: 8, count: 8192, offset: item + 2 })
        );
    }

    #[test]
    fn test_many_items_do_not_overflow() {
        let mut bytes = vec![0x76, 0x00, 0x01, 0x96, 0x00, 0x30];
        for _ in 0..1400 {
            bytes.extend_from_slice(&[0xb1, 0x03]);
        }
        assert!(matches!(
            ReportDescriptor::parse(&bytes),
            Err(DescriptorError::InvalidReportLayout { .. })
        ));
    }

    #[test]
    fn test_encode_packs_fields_after_report_id() {
        let desc = ReportDescriptor::parse(KBD_BACKLIGHT_DESCRIPTOR).unwrap();
        let report = desc.report(ReportType::Feature, 1).unwrap();

        let mut out = Vec::new();
        report.encode(&[200, 0x5e | (1 << 8)], &mut out);
        assert_eq!(out, vec![0x01, 200, 0x5e, 0x01]);
    }

    #[test]
    fn test_encode_truncates_to_report_size_and_zero_fills() {
        let desc = ReportDescriptor::parse(KBD_BACKLIGHT_DESCRIPTOR).unwrap();
        let report = desc.report(ReportType::Feature, 3).unwrap();

        let mut out = vec![0xaa; 16];
        report.encode(&[0x1ff], &mut out);
        assert_eq!(out, vec![0x03, 0xff, 0x00, 0x00]);
    }

    #[test]
    fn test_encode_sub_byte_fields() {
        #[rustfmt::skip]
        let bytes = [
            0x85, 0x05,       // Report ID (5)
            0x09, 0x01,       // Usage (0x01)
            0x75, 0x04,       // Report Size (4)
            0x95, 0x01,       // Report Count (1)
            0xb1, 0x02,       // Feature (Data,Var,Abs)
            0x09, 0x02,       // Usage (0x02)
            0xb1, 0x02,       // Feature (Data,Var,Abs)
        ];
        let desc = ReportDescriptor::parse(&bytes).unwrap();
        let report = desc.report(ReportType::Feature, 5).unwrap();

        let mut out = Vec::new();
        report.encode(&[0x3, 0xa], &mut out);
        assert_eq!(out, vec![0x05, 0xa3]);
    }
}
