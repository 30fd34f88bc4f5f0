use crate::{ExportError, ExportRequest, Exporter};
use async_trait::async_trait;
use plan_core::money::{format_currency_display, format_number_display, format_percentage_display};
use plan_core::{Field, FieldKind};

/// Renders the canvas as UTF-8 plain text. Raster options are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextCanvasExporter;

impl TextCanvasExporter {
    pub fn render_text(&self, request: &ExportRequest<'_>) -> String {
        let state = request.state;
        let m = &request.metrics;
        let mut out = String::new();

        out.push_str("PLANO DE PROSPECÇÃO\n");
        out.push_str(&format!(
            "Exportado em {}\n",
            request.exported_at.format("%Y-%m-%d %H:%M UTC")
        ));
        out.push('\n');
        out.push_str(&format!("{}: {}\n", Field::Company.label(), state.company));
        out.push_str(&format!("{}: {}\n", Field::Product.label(), state.product));
        out.push('\n');

        heading(&mut out, "METAS");
        out.push_str(&format!(
            "{}: {}\n{}: {}\n{}: {}\n",
            Field::SalesGoal.label(),
            format_currency_display(state.sales_goal),
            Field::AverageTicket.label(),
            format_currency_display(state.average_ticket),
            Field::ConversionRate.label(),
            format_percentage_display(state.conversion_rate)
        ));
        out.push_str(&format!(
            "Vendas Necessárias: {} vendas no mês | {} por semana | {} por dia útil\n",
            format_number_display(m.sales_per_month),
            format_number_display(m.sales_per_week),
            format_number_display(m.sales_per_day)
        ));
        out.push_str(&format!(
            "Leads Necessários: {} leads\nCapacidade de Vendas: {} contatos por dia\n",
            format_number_display(m.required_leads),
            format_number_display(m.daily_outreach)
        ));
        out.push('\n');

        heading(&mut out, "PLANO DE EXECUÇÃO");
        let plan = Field::ALL
            .iter()
            .copied()
            .filter(|f| f.kind() == FieldKind::Text && !matches!(f, Field::Company | Field::Product));
        for field in plan {
            out.push_str(&field.label().to_uppercase());
            out.push('\n');
            out.push_str(&format!("  {}\n", field.prompt()));
            let text = state.text(field).unwrap_or_default();
            if text.is_empty() {
                out.push_str("    -\n");
            }
            for line in text.lines() {
                out.push_str(&format!("    {line}\n"));
            }
            out.push('\n');
        }
        out
    }
}

fn heading(out: &mut String, title: &str) {
    out.push_str(title);
    out.push('\n');
    out.push_str(&"-".repeat(title.chars().count()));
    out.push('\n');
}

#[async_trait]
impl Exporter for TextCanvasExporter {
    fn extension(&self) -> &str {
        "txt"
    }

    async fn render(&self, request: &ExportRequest<'_>) -> Result<Vec<u8>, ExportError> {
        Ok(self.render_text(request).into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RenderOptions;
    use chrono::{TimeZone, Utc};
    use plan_core::{FunnelConstants, WorksheetState};
    use plan_metrics::metrics_for;
    use rust_decimal::Decimal;

    fn sample() -> WorksheetState {
        WorksheetState {
            company: "Acme".into(),
            product: "Consultoria".into(),
            sales_goal: Decimal::new(10_000, 0),
            average_ticket: Decimal::new(500, 0),
            conversion_rate: Decimal::new(10, 0),
            approach: "Olá [Nome],\nvi que vocês...".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn renders_goals_metrics_and_plan() {
        let state = sample();
        let request = ExportRequest {
            state: &state,
            metrics: metrics_for(&state, &FunnelConstants::default()),
            options: RenderOptions::default(),
            exported_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap(),
        };
        let bytes = TextCanvasExporter.render(&request).await.unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("PLANO DE PROSPECÇÃO\nExportado em 2026-10-19 09:30 UTC\n"));
        assert!(text.contains("Empresa: Acme\n"));
        assert!(text.contains("\nMETAS\n-----\n"));
        assert!(text.contains("Meta de Vendas: R$\u{a0}10.000,00\n"));
        assert!(text.contains("Taxa de Conversão: 10%\n"));
        assert!(text.contains("20 vendas no mês | 5 por semana | 1 por dia útil"));
        assert!(text.contains("Leads Necessários: 200 leads\n"));
        assert!(text.contains("Capacidade de Vendas: 10 contatos por dia\n"));
        assert!(text.contains("ABORDAGEM\n  Como é a sua mensagem inicial?\n    Olá [Nome],\n    vi que vocês...\n"));
        assert!(text.contains("OBJEÇÕES\n  Quais são as 3 principais objeções?\n    -\n"));
        assert!(!text.contains("EMPRESA\n"));
    }
}
