//! Document rendering collaborator.
//!
//! Produces an opaque PDF byte stream from a finished, immutable document
//! plus the tenant's branding. Rendering can fail or degrade, but it never
//! touches persisted document state.

use crate::models::money;
use crate::models::{Company, Document, LineItem};
use crate::services::metrics::RENDER_DURATION;
use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document as PdfDocument, Object, Stream};
use service_core::error::AppError;
use std::time::Duration;
use tracing::{instrument, warn};

/// Logo fetches are bounded; a slow or missing asset degrades the output,
/// it does not fail the request.
const LOGO_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(
        &self,
        company: &Company,
        document: &Document,
        line_items: &[LineItem],
    ) -> Result<Vec<u8>, AppError>;
}

pub struct PdfRenderer {
    http: reqwest::Client,
}

impl PdfRenderer {
    pub fn new() -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(LOGO_FETCH_TIMEOUT)
            .build()
            .map_err(|e| {
                AppError::InternalError(anyhow::anyhow!("Failed to build HTTP client: {}", e))
            })?;
        Ok(Self { http })
    }

    /// Fetch the tenant logo, tolerating absence, timeouts and bad bodies.
    async fn fetch_logo(&self, url: &str) -> Option<Vec<u8>> {
        match self.http.get(url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.bytes().await {
                Ok(bytes) => Some(bytes.to_vec()),
                Err(e) => {
                    warn!(error = %e, "Logo body read failed; rendering without logo");
                    None
                }
            },
            Ok(resp) => {
                warn!(status = %resp.status(), "Logo fetch returned non-success; rendering without logo");
                None
            }
            Err(e) => {
                warn!(error = %e, "Logo fetch failed; rendering without logo");
                None
            }
        }
    }
}

#[async_trait]
impl Renderer for PdfRenderer {
    #[instrument(skip_all, fields(document_id = %document.document_id))]
    async fn render(
        &self,
        company: &Company,
        document: &Document,
        line_items: &[LineItem],
    ) -> Result<Vec<u8>, AppError> {
        let logo = match &company.logo_url {
            Some(url) => self.fetch_logo(url).await,
            None => None,
        };
        let degraded = company.logo_url.is_some() && logo.is_none();

        let timer = RENDER_DURATION
            .with_label_values(&[if degraded { "degraded" } else { "ok" }])
            .start_timer();

        let bytes = build_pdf(company, document, line_items, logo.as_deref())
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("PDF encoding failed: {}", e)))?;

        timer.observe_duration();

        Ok(bytes)
    }
}

fn build_pdf(
    company: &Company,
    document: &Document,
    line_items: &[LineItem],
    logo: Option<&[u8]>,
) -> Result<Vec<u8>, lopdf::Error> {
    let mut doc = PdfDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut resources = dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    };

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 11.into()]),
        Operation::new("TL", vec![14.into()]),
        Operation::new("Td", vec![50.into(), 780.into()]),
    ];
    for line in text_lines(company, document, line_items) {
        operations.push(Operation::new("Tj", vec![Object::string_literal(line)]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    // Only JPEG logos are embedded; anything else already degraded to a
    // text-only render.
    if let Some(jpeg) = logo {
        if let Some((width, height)) = jpeg_dimensions(jpeg) {
            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width as i64,
                    "Height" => height as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                jpeg.to_vec(),
            ));
            resources.set("XObject", dictionary! { "Logo" => image_id });

            // Top-right corner, 80pt wide, aspect preserved (capped so a
            // tall logo cannot run off the page).
            let scaled_w: i64 = 80;
            let scaled_h = (scaled_w * height as i64 / width as i64).clamp(1, 120);
            operations.extend([
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        scaled_w.into(),
                        0.into(),
                        0.into(),
                        scaled_h.into(),
                        465.into(),
                        (820 - scaled_h).into(),
                    ],
                ),
                Operation::new("Do", vec!["Logo".into()]),
                Operation::new("Q", vec![]),
            ]);
        } else {
            warn!("Logo is not a decodable JPEG; rendering without logo");
        }
    }

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let resources_id = doc.add_object(resources);
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

fn text_lines(company: &Company, document: &Document, line_items: &[LineItem]) -> Vec<String> {
    let mut lines = vec![company.name.clone()];
    if let Some(address) = &company.address {
        lines.extend(address.lines().map(str::to_string));
    }
    if let Some(phone) = &company.phone {
        lines.push(format!("Tel: {}", phone));
    }
    lines.push(String::new());
    lines.push(format!(
        "{} {}",
        document.document_type.to_uppercase(),
        document.document_number
    ));
    lines.push(format!("Date: {}", document.created_utc.format("%Y-%m-%d")));
    lines.push(String::new());
    lines.push(format!("Bill To: {}", document.customer_name));
    if let Some(phone) = &document.customer_phone {
        lines.push(format!("Tel: {}", phone));
    }
    lines.push(String::new());
    for item in line_items {
        lines.push(format!(
            "{}  {} x RM {} = RM {}",
            item.description,
            item.quantity,
            money::format_cents(item.unit_price),
            money::format_cents(item.total)
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "Subtotal: RM {}",
        money::format_cents(document.subtotal)
    ));
    if document.tax_amount > 0 {
        lines.push(format!(
            "Tax ({}%): RM {}",
            money::format_rate(document.tax_rate),
            money::format_cents(document.tax_amount)
        ));
    }
    lines.push(format!("Total: RM {}", money::format_cents(document.total)));
    if let Some(notes) = &document.notes {
        lines.push(String::new());
        lines.push(format!("Notes: {}", notes));
    }
    lines
}

/// Width and height from a JPEG SOF marker. `None` for anything that is
/// not a baseline or progressive JPEG.
fn jpeg_dimensions(data: &[u8]) -> Option<(u16, u16)> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return None;
    }
    let mut i = 2;
    while i + 9 < data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        // Standalone markers carry no length segment.
        if (0xD0..=0xD9).contains(&marker) || marker == 0x01 {
            i += 2;
            continue;
        }
        let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        if len < 2 {
            return None;
        }
        if matches!(marker, 0xC0 | 0xC1 | 0xC2 | 0xC3) {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]);
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]);
            if width == 0 || height == 0 {
                return None;
            }
            return Some((width, height));
        }
        i += 2 + len;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_dimensions_reads_sof0() {
        // SOI, then a minimal SOF0 segment: 32 wide, 16 high.
        let data = [
            0xFF, 0xD8, // SOI
            0xFF, 0xC0, 0x00, 0x0B, // SOF0, length 11
            0x08, // precision
            0x00, 0x10, // height 16
            0x00, 0x20, // width 32
            0x01, 0x01, 0x11, 0x00, // one component
        ];
        assert_eq!(jpeg_dimensions(&data), Some((32, 16)));
    }

    #[test]
    fn jpeg_dimensions_rejects_other_formats() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(jpeg_dimensions(&png), None);
        assert_eq!(jpeg_dimensions(&[]), None);
    }
}
