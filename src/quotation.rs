//! Quotation data model and the flattened context handed to the template.
//!
//! Field names follow the keys the quotation template consumes
//! (`razao_social`, `quantidade_kg`, ...), so the serialized form of a
//! [`RenderContext`] is exactly what the template sees.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::company::CompanyProfile;
use crate::error::{QuoteError, Result};

/// Date format printed on the document.
pub const DISPLAY_DATE: &str = "%d/%m/%Y";

/// Issuing company as printed in the header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Company {
    pub nome: String,
    pub endereco: String,
    pub bairro_cidade_uf: String,
    pub cep: String,
    pub contato: String,
    /// File name or path used to look the logo up.
    pub logo_path: String,
    /// Embedded logo as a data URI, when one was found.
    pub logo_base64: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Client {
    pub razao_social: String,
    pub endereco: String,
    pub bairro: String,
    pub cidade: String,
    pub uf: String,
    pub cep: String,
    pub cnpj: String,
    pub inscricao_estadual: String,
    pub telefone: String,
    pub contato: String,
    pub email: String,
}

/// One priced product entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    pub descricao: String,
    pub filme: String,
    pub cor_codigo: String,
    pub acabamento: String,
    pub medida: String,
    /// Quantity in kg.
    pub quantidade_kg: f64,
    /// Unit price per kg.
    pub valor_kg: f64,
    /// IPI rate shown next to the item, in percent.
    pub ipi_item: f64,
}

impl LineItem {
    pub fn subtotal(&self) -> f64 {
        self.quantidade_kg * self.valor_kg
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub condicao: String,
    pub qtde_parcelas: u32,
    pub data_entrega: Option<NaiveDate>,
}

impl Default for Payment {
    fn default() -> Self {
        Self {
            condicao: "28/35/42 ddl".to_string(),
            qtde_parcelas: 3,
            data_entrega: None,
        }
    }
}

impl Payment {
    /// Invoice total split evenly; 0 when there are no installments.
    pub fn installment_value(&self, total: f64) -> f64 {
        if self.qtde_parcelas == 0 {
            0.0
        } else {
            total / f64::from(self.qtde_parcelas)
        }
    }
}

/// Tax and goods totals of a quotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub base_calculo_icms: f64,
    pub icms_perc: f64,
    pub valor_mercadoria: f64,
    pub ipi_perc: f64,
    pub valor_ipi: f64,
    pub total_nf: f64,
    pub total_kg: f64,
}

impl Totals {
    pub fn compute(items: &[LineItem], icms_perc: f64, ipi_perc: f64) -> Self {
        let valor_mercadoria: f64 = items.iter().map(LineItem::subtotal).sum();
        let valor_ipi = valor_mercadoria * ipi_perc / 100.0;
        Self {
            base_calculo_icms: valor_mercadoria,
            icms_perc,
            valor_mercadoria,
            ipi_perc,
            valor_ipi,
            total_nf: valor_mercadoria + valor_ipi,
            total_kg: items.iter().map(|i| i.quantidade_kg).sum(),
        }
    }
}

/// Shipping company.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Carrier {
    pub nome: String,
    pub cnpj: String,
    pub telefone: String,
}

/// Everything needed to render one quotation document.
#[derive(Debug, Clone, PartialEq)]
pub struct Quotation {
    pub empresa: Company,
    pub numero: u32,
    pub data_emissao: NaiveDate,
    pub vendedor: String,
    pub cliente: Client,
    pub itens: Vec<LineItem>,
    pub pagamento: Payment,
    pub icms_perc: f64,
    pub ipi_perc: f64,
    pub transportadora: Carrier,
    pub observacoes: String,
    pub watermark_datauri: Option<String>,
}

impl Quotation {
    pub fn totals(&self) -> Totals {
        Totals::compute(&self.itens, self.icms_perc, self.ipi_perc)
    }

    /// Collect every problem that would make the document meaningless.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.cliente.razao_social.trim().is_empty() {
            errors.push("client legal name (razao_social) is empty".to_string());
        }
        if self.itens.is_empty() {
            errors.push("no items added".to_string());
        }
        for (idx, item) in self.itens.iter().enumerate() {
            if !(item.quantidade_kg > 0.0) {
                errors.push(format!("item {}: invalid quantity {}", idx + 1, item.quantidade_kg));
            }
            if !(item.valor_kg > 0.0) {
                errors.push(format!("item {}: invalid unit price {}", idx + 1, item.valor_kg));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(QuoteError::InvalidQuotation(errors))
        }
    }

    /// `Orcamento_<number>_<legal name with spaces replaced by _>.pdf`.
    pub fn output_file_name(&self) -> String {
        format!(
            "Orcamento_{}_{}.pdf",
            self.numero,
            self.cliente.razao_social.replace(' ', "_")
        )
    }

    pub fn to_context(&self) -> RenderContext {
        let totais = self.totals();
        RenderContext {
            empresa: self.empresa.clone(),
            orcamento_numero: self.numero,
            data_emissao: self.data_emissao.format(DISPLAY_DATE).to_string(),
            vendedor: self.vendedor.clone(),
            cliente: self.cliente.clone(),
            itens: self
                .itens
                .iter()
                .map(|item| ItemContext {
                    subtotal: item.subtotal(),
                    item: item.clone(),
                })
                .collect(),
            pagamento: PaymentContext {
                condicao: self.pagamento.condicao.clone(),
                qtde_parcelas: self.pagamento.qtde_parcelas,
                data_entrega: self
                    .pagamento
                    .data_entrega
                    .map(|d| d.format(DISPLAY_DATE).to_string())
                    .unwrap_or_default(),
                valor_parcela: self.pagamento.installment_value(totais.total_nf),
            },
            totais,
            transportadora: self.transportadora.clone(),
            observacoes: self.observacoes.clone(),
            watermark_datauri: self.watermark_datauri.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemContext {
    #[serde(flatten)]
    pub item: LineItem,
    pub subtotal: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentContext {
    pub condicao: String,
    pub qtde_parcelas: u32,
    /// `dd/mm/yyyy`, empty when no date was agreed.
    pub data_entrega: String,
    pub valor_parcela: f64,
}

/// The mapping the template renders against.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext {
    pub empresa: Company,
    pub orcamento_numero: u32,
    pub data_emissao: String,
    pub vendedor: String,
    pub cliente: Client,
    pub itens: Vec<ItemContext>,
    pub pagamento: PaymentContext,
    pub totais: Totals,
    pub transportadora: Carrier,
    pub observacoes: String,
    pub watermark_datauri: Option<String>,
}

/// Accepts `yyyy-mm-dd` or `dd/mm/yyyy`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, DISPLAY_DATE))
        .ok()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ItemRequest {
    pub descricao: String,
    pub filme: String,
    pub cor_codigo: String,
    pub acabamento: String,
    pub medida: String,
    pub quantidade_kg: f64,
    pub valor_kg: f64,
    /// Defaults to the quotation's IPI rate.
    pub ipi_item: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentRequest {
    pub condicao: String,
    pub qtde_parcelas: u32,
    pub data_entrega: Option<String>,
}

impl Default for PaymentRequest {
    fn default() -> Self {
        let payment = Payment::default();
        Self {
            condicao: payment.condicao,
            qtde_parcelas: payment.qtde_parcelas,
            data_entrega: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TaxRequest {
    pub icms: f64,
    pub ipi: f64,
}

impl Default for TaxRequest {
    fn default() -> Self {
        Self {
            icms: 18.0,
            ipi: 0.0,
        }
    }
}

/// Raw quotation input as read from JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuoteRequest {
    /// Company preset key (`ISOFORMA`, `PLASTY`).
    pub empresa: String,
    pub orcamento_numero: u32,
    pub data_emissao: Option<String>,
    pub vendedor: String,
    pub cliente: Client,
    pub itens: Vec<ItemRequest>,
    pub pagamento: PaymentRequest,
    pub impostos: TaxRequest,
    pub transportadora: Carrier,
    pub observacoes: String,
}

impl Default for QuoteRequest {
    fn default() -> Self {
        Self {
            empresa: "ISOFORMA".to_string(),
            orcamento_numero: 1,
            data_emissao: None,
            vendedor: String::new(),
            cliente: Client::default(),
            itens: Vec::new(),
            pagamento: PaymentRequest::default(),
            impostos: TaxRequest::default(),
            transportadora: Carrier::default(),
            observacoes: String::new(),
        }
    }
}

impl QuoteRequest {
    /// Build a quotation. `today` is the issue date unless the request
    /// carries one.
    pub fn into_quotation(self, today: NaiveDate) -> Result<Quotation> {
        let profile = CompanyProfile::lookup(&self.empresa)
            .ok_or_else(|| QuoteError::Config(format!("unknown company '{}'", self.empresa)))?;
        let date = |field: &str, value: &str| {
            parse_date(value)
                .ok_or_else(|| QuoteError::Config(format!("invalid {field} date '{value}'")))
        };
        let data_emissao = match self.data_emissao.as_deref() {
            Some(d) if !d.trim().is_empty() => date("issue", d)?,
            _ => today,
        };
        let data_entrega = match self.pagamento.data_entrega.as_deref() {
            Some(d) if !d.trim().is_empty() => Some(date("delivery", d)?),
            _ => None,
        };
        let ipi = self.impostos.ipi;
        let itens = self
            .itens
            .into_iter()
            .map(|i| LineItem {
                descricao: i.descricao,
                filme: i.filme,
                cor_codigo: i.cor_codigo,
                acabamento: i.acabamento,
                medida: i.medida,
                quantidade_kg: i.quantidade_kg,
                valor_kg: i.valor_kg,
                ipi_item: i.ipi_item.unwrap_or(ipi),
            })
            .collect();

        Ok(Quotation {
            empresa: profile.to_company(),
            numero: self.orcamento_numero,
            data_emissao,
            vendedor: self.vendedor,
            cliente: self.cliente,
            itens,
            pagamento: Payment {
                condicao: self.pagamento.condicao,
                qtde_parcelas: self.pagamento.qtde_parcelas,
                data_entrega,
            },
            icms_perc: self.impostos.icms,
            ipi_perc: ipi,
            transportadora: self.transportadora,
            observacoes: self.observacoes,
            watermark_datauri: None,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn item(qty: f64, price: f64) -> LineItem {
        LineItem {
            descricao: "Chapa PSAI Tricamada".into(),
            filme: "Não".into(),
            cor_codigo: "Branco Tricamada".into(),
            acabamento: "BM".into(),
            medida: "2000x1000x0,50mm".into(),
            quantidade_kg: qty,
            valor_kg: price,
            ipi_item: 5.0,
        }
    }

    pub(crate) fn sample_quotation() -> Quotation {
        Quotation {
            empresa: CompanyProfile::lookup("ISOFORMA").unwrap().to_company(),
            numero: 10,
            data_emissao: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            vendedor: "Taty".into(),
            cliente: Client {
                razao_social: "Cliente XYZ Ltda".into(),
                cnpj: "12.345.678/0001-90".into(),
                ..Client::default()
            },
            itens: vec![item(50.0, 20.0)],
            pagamento: Payment::default(),
            icms_perc: 18.0,
            ipi_perc: 5.0,
            transportadora: Carrier::default(),
            observacoes: String::new(),
            watermark_datauri: None,
        }
    }

    #[test]
    fn totals_for_reference_scenario() {
        let totals = sample_quotation().totals();
        assert_eq!(totals.valor_mercadoria, 1000.0);
        assert_eq!(totals.base_calculo_icms, 1000.0);
        assert_eq!(totals.valor_ipi, 50.0);
        assert_eq!(totals.total_nf, 1050.0);
        assert_eq!(totals.total_kg, 50.0);
    }

    #[test]
    fn goods_total_is_sum_of_subtotals() {
        let items = vec![item(1.5, 12.4), item(3.25, 8.0), item(0.1, 0.3)];
        let totals = Totals::compute(&items, 0.0, 0.0);
        let expected: f64 = items.iter().map(|i| i.quantidade_kg * i.valor_kg).sum();
        assert_eq!(totals.valor_mercadoria, expected);
        assert_eq!(totals.total_nf, expected);
    }

    #[test]
    fn installments_split_invoice_total() {
        let mut payment = Payment::default();
        assert_eq!(payment.installment_value(1050.0), 350.0);
        payment.qtde_parcelas = 0;
        assert_eq!(payment.installment_value(1050.0), 0.0);
    }

    #[test]
    fn validation_collects_every_problem() {
        let mut q = sample_quotation();
        q.cliente.razao_social = "  ".into();
        q.itens = vec![item(0.0, 10.0), item(2.0, -1.0), item(f64::NAN, 1.0)];
        match q.validate() {
            Err(QuoteError::InvalidQuotation(errors)) => {
                assert_eq!(errors.len(), 4, "{errors:?}");
                assert!(errors[1].starts_with("item 1"));
                assert!(errors[2].starts_with("item 2"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        let mut empty = sample_quotation();
        empty.itens.clear();
        assert!(empty.validate().is_err());
        assert!(sample_quotation().validate().is_ok());
    }

    #[test]
    fn context_uses_template_keys() {
        let mut q = sample_quotation();
        q.pagamento.data_entrega = NaiveDate::from_ymd_opt(2024, 4, 1);
        let value = serde_json::to_value(q.to_context()).unwrap();
        assert_eq!(value["orcamento_numero"], 10);
        assert_eq!(value["data_emissao"], "05/03/2024");
        assert_eq!(value["cliente"]["razao_social"], "Cliente XYZ Ltda");
        assert_eq!(value["itens"][0]["quantidade_kg"], 50.0);
        assert_eq!(value["itens"][0]["subtotal"], 1000.0);
        assert_eq!(value["pagamento"]["data_entrega"], "01/04/2024");
        assert_eq!(value["pagamento"]["valor_parcela"], 350.0);
        assert_eq!(value["totais"]["total_nf"], 1050.0);
        assert!(value["watermark_datauri"].is_null());
        assert!(value["empresa"]["logo_base64"].is_null());
    }

    #[test]
    fn output_file_name_replaces_spaces() {
        assert_eq!(
            sample_quotation().output_file_name(),
            "Orcamento_10_Cliente_XYZ_Ltda.pdf"
        );
    }

    #[test]
    fn request_fills_defaults_and_inherits_ipi() {
        let request: QuoteRequest = serde_json::from_value(json!({
            "empresa": "plasty",
            "orcamento_numero": 7,
            "cliente": {"razao_social": "Cliente XYZ Ltda"},
            "itens": [
                {"descricao": "Filme", "quantidade_kg": 50.0, "valor_kg": 20.0},
                {"descricao": "Saco", "quantidade_kg": 1.0, "valor_kg": 2.0, "ipi_item": 0.0}
            ],
            "pagamento": {"data_entrega": "20/05/2024"},
            "impostos": {"ipi": 5.0}
        }))
        .unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let q = request.into_quotation(today).unwrap();
        assert_eq!(q.empresa.nome, "PLASTY COMERCIAL DE PLÁSTICOS LTDA");
        assert_eq!(q.data_emissao, today);
        assert_eq!(q.pagamento.qtde_parcelas, 3);
        assert_eq!(q.pagamento.data_entrega, NaiveDate::from_ymd_opt(2024, 5, 20));
        assert_eq!(q.icms_perc, 18.0);
        assert_eq!(q.itens[0].ipi_item, 5.0);
        assert_eq!(q.itens[1].ipi_item, 0.0);
        assert_eq!(q.totals().total_nf, 1002.0 + 50.1);
    }

    #[test]
    fn request_rejects_unknown_company_and_bad_dates() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let unknown = QuoteRequest {
            empresa: "ACME".into(),
            ..QuoteRequest::default()
        };
        assert!(matches!(unknown.into_quotation(today), Err(QuoteError::Config(_))));

        let mut bad_date = QuoteRequest::default();
        bad_date.pagamento.data_entrega = Some("31/02/2024".into());
        assert!(bad_date.into_quotation(today).is_err());
    }
}
