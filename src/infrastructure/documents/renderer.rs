//! Plain-text document renderer
//!
//! Produces contracts and inspection reports as UTF-8 text. Layout is
//! deliberately minimal; a PDF renderer can replace it behind the same port.

use std::fmt::Write;

use async_trait::async_trait;

use crate::application::ports::{DocumentRenderer, RenderedDocument, SinkError};
use crate::domain::asset::Asset;
use crate::domain::reservation::{DocumentKind, Reservation};

#[derive(Debug, Clone)]
pub struct PlainTextRenderer {
    currency: String,
}

impl PlainTextRenderer {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
        }
    }

    fn money(&self, minor: i64) -> String {
        let sign = if minor < 0 { "-" } else { "" };
        let abs = minor.unsigned_abs();
        format!("{sign}{}.{:02} {}", abs / 100, abs % 100, self.currency)
    }

    fn body(
        &self,
        kind: DocumentKind,
        r: &Reservation,
        asset: Option<&Asset>,
    ) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        let title = match kind {
            DocumentKind::Contract => "RENTAL CONTRACT",
            DocumentKind::CheckoutReport => "CHECK-OUT REPORT",
            DocumentKind::CheckinReport => "CHECK-IN REPORT",
        };
        writeln!(out, "{title}")?;
        writeln!(out, "Reservation: {}", r.id)?;
        match asset {
            Some(a) => writeln!(out, "Vehicle: {} ({})", a.label, a.category)?,
            None => writeln!(out, "Vehicle: {}", r.asset_id)?,
        }
        writeln!(out, "Requester: {}", r.requester_id)?;
        writeln!(out, "From: {}", r.start_at.to_rfc3339())?;
        writeln!(out, "Until: {}", r.end_at.to_rfc3339())?;
        writeln!(out, "Status: {}", r.status)?;

        match kind {
            DocumentKind::Contract => {
                writeln!(out, "Amount: {}", self.money(r.amount))?;
                writeln!(out, "Guarantee: {}", self.money(r.guarantee_amount))?;
            }
            DocumentKind::CheckoutReport => {
                if let Some(c) = &r.checkout {
                    writeln!(out, "Odometer: {} km", c.odometer)?;
                    writeln!(out, "Fuel: {}%", c.fuel_level)?;
                    writeln!(out, "Guarantee paid by: {}", c.payment_method)?;
                    writeln!(out, "Handed over: {}", c.at.to_rfc3339())?;
                }
            }
            DocumentKind::CheckinReport => {
                if let Some(c) = &r.checkin {
                    writeln!(out, "Odometer: {} km", c.odometer)?;
                    writeln!(out, "Fuel: {}%", c.fuel_level)?;
                    writeln!(out, "Returned: {}", c.at.to_rfc3339())?;
                    if c.damage_reports.is_empty() {
                        writeln!(out, "Damage: none reported")?;
                    }
                    for d in &c.damage_reports {
                        write!(out, "Damage: {}", d.description)?;
                        if let Some(location) = &d.location {
                            write!(out, " at {location}")?;
                        }
                        if let Some(severity) = &d.severity {
                            write!(out, " [{severity}]")?;
                        }
                        writeln!(out)?;
                    }
                }
            }
        }

        if let Some(notes) = r.notes.as_deref().filter(|n| !n.is_empty()) {
            writeln!(out, "Notes:\n{notes}")?;
        }
        Ok(out)
    }
}

#[async_trait]
impl DocumentRenderer for PlainTextRenderer {
    async fn render(
        &self,
        kind: DocumentKind,
        reservation: &Reservation,
        asset: Option<&Asset>,
    ) -> Result<RenderedDocument, SinkError> {
        let body = self
            .body(kind, reservation, asset)
            .map_err(|e| SinkError::Render(e.to_string()))?;
        Ok(RenderedDocument {
            file_name: format!("{}-{}.txt", kind.file_stem(), reservation.id),
            content_type: "text/plain; charset=utf-8".to_string(),
            bytes: body.into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reservation::{NewReservation, TimeWindow};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_contract_lists_amounts() {
        let now = Utc::now();
        let tenant = Uuid::new_v4();
        let asset = Asset::new(tenant, "AB-123-CD", "compact");
        let reservation = Reservation::new(
            NewReservation {
                tenant_id: tenant,
                asset_id: asset.id,
                requester_id: Uuid::new_v4(),
                window: TimeWindow::new(now, now + Duration::days(2)).unwrap(),
                amount: 12_345,
                guarantee_amount: 30_000,
                notes: None,
                created_by: None,
            },
            now,
        );

        let doc = PlainTextRenderer::new("EUR")
            .render(DocumentKind::Contract, &reservation, Some(&asset))
            .await
            .unwrap();
        let text = String::from_utf8(doc.bytes).unwrap();

        assert_eq!(doc.file_name, format!("contract-{}.txt", reservation.id));
        assert!(text.contains("Vehicle: AB-123-CD (compact)"));
        assert!(text.contains("Amount: 123.45 EUR"));
        assert!(text.contains("Guarantee: 300.00 EUR"));
    }
}
