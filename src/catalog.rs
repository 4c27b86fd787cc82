//! Spreadsheet-backed client and product catalog.
//!
//! A [`Workbook`] holds named tabs of string cells whose first row is the
//! header. [`JsonWorkbook`] keeps them in one JSON file, rewritten after
//! every append. [`Catalog`] maps the `Clientes` and `Produtos` tabs to typed
//! records and caches what it has read.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::quotation::{Client, LineItem};

pub const CLIENTS_SHEET: &str = "Clientes";
pub const PRODUCTS_SHEET: &str = "Produtos";

pub const CLIENT_COLUMNS: [&str; 13] = [
    "id",
    "razao_social",
    "endereco",
    "bairro",
    "cidade",
    "uf",
    "cep",
    "cnpj",
    "inscricao_estadual",
    "telefone",
    "contato",
    "email",
    "data_cadastro",
];

pub const PRODUCT_COLUMNS: [&str; 9] = [
    "id",
    "sku",
    "descricao",
    "filme",
    "cor_codigo",
    "acabamento",
    "medida",
    "valor_kg",
    "data_cadastro",
];

/// One tab: a header row plus data rows. Persisted as a plain grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Vec<String>>", into = "Vec<Vec<String>>")]
pub struct Worksheet {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl From<Vec<Vec<String>>> for Worksheet {
    fn from(mut grid: Vec<Vec<String>>) -> Self {
        if grid.is_empty() {
            return Self::default();
        }
        let header = grid.remove(0);
        // Blank rows carry no record.
        grid.retain(|row| row.iter().any(|cell| !cell.trim().is_empty()));
        Self { header, rows: grid }
    }
}

impl From<Worksheet> for Vec<Vec<String>> {
    fn from(sheet: Worksheet) -> Self {
        std::iter::once(sheet.header).chain(sheet.rows).collect()
    }
}

impl Worksheet {
    pub fn with_header(columns: &[&str]) -> Self {
        Self {
            header: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.header.iter().position(|h| h.trim() == column)
    }

    /// Every data cell of `column`; short rows yield `""`.
    pub fn column_values(&self, sheet: &str, column: &str) -> Result<Vec<&str>, StoreError> {
        let idx = self.column_index(column).ok_or_else(|| StoreError::MissingColumn {
            sheet: sheet.to_string(),
            column: column.to_string(),
        })?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
            .collect())
    }

    /// Rows as column -> value maps.
    pub fn records(&self) -> Vec<HashMap<&str, &str>> {
        self.rows
            .iter()
            .map(|row| {
                self.header
                    .iter()
                    .enumerate()
                    .map(|(i, h)| (h.trim(), row.get(i).map(String::as_str).unwrap_or("")))
                    .collect()
            })
            .collect()
    }

    /// Lay `values` out in header order; unknown columns become `""`.
    pub fn row_from(&self, values: &HashMap<&str, String>) -> Vec<String> {
        self.header
            .iter()
            .map(|h| values.get(h.trim()).cloned().unwrap_or_default())
            .collect()
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn pop(&mut self) {
        self.rows.pop();
    }
}

/// A set of named worksheets.
pub trait Workbook {
    fn worksheet(&self, name: &str) -> Result<&Worksheet, StoreError>;

    fn append_row(&mut self, sheet: &str, row: Vec<String>) -> Result<(), StoreError>;
}

/// Worksheets stored as `{ "<tab>": [[header...], [row...], ...] }`.
#[derive(Debug, Clone, Default)]
pub struct JsonWorkbook {
    path: Option<PathBuf>,
    sheets: BTreeMap<String, Worksheet>,
}

impl JsonWorkbook {
    /// Never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load `path`, or start empty when it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let sheets = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            BTreeMap::new()
        };
        log::debug!("Opened workbook {} ({} tab(s))", path.display(), sheets.len());
        Ok(Self {
            path: Some(path),
            sheets,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Create `name` with `columns` as header unless it exists.
    pub fn ensure_sheet(&mut self, name: &str, columns: &[&str]) -> Result<(), StoreError> {
        if self.sheets.contains_key(name) {
            return Ok(());
        }
        self.sheets
            .insert(name.to_string(), Worksheet::with_header(columns));
        if let Err(e) = self.save() {
            self.sheets.remove(name);
            return Err(e);
        }
        Ok(())
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self.sheets)?)?;
        Ok(())
    }
}

impl Workbook for JsonWorkbook {
    fn worksheet(&self, name: &str) -> Result<&Worksheet, StoreError> {
        self.sheets
            .get(name)
            .ok_or_else(|| StoreError::WorksheetNotFound(name.to_string()))
    }

    /// The row is only kept if the workbook could be written back.
    fn append_row(&mut self, sheet: &str, row: Vec<String>) -> Result<(), StoreError> {
        self.sheets
            .get_mut(sheet)
            .ok_or_else(|| StoreError::WorksheetNotFound(sheet.to_string()))?
            .push(row);
        if let Err(e) = self.save() {
            if let Some(ws) = self.sheets.get_mut(sheet) {
                ws.pop();
            }
            return Err(e);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientRecord {
    pub id: String,
    #[serde(flatten)]
    pub client: Client,
    pub data_cadastro: String,
}

impl ClientRecord {
    fn from_record(r: &HashMap<&str, &str>) -> Self {
        let get = |k: &str| r.get(k).copied().unwrap_or("").to_string();
        Self {
            id: get("id"),
            client: Client {
                razao_social: get("razao_social"),
                endereco: get("endereco"),
                bairro: get("bairro"),
                cidade: get("cidade"),
                uf: get("uf"),
                cep: get("cep"),
                cnpj: get("cnpj"),
                inscricao_estadual: get("inscricao_estadual"),
                telefone: get("telefone"),
                contato: get("contato"),
                email: get("email"),
            },
            data_cadastro: get("data_cadastro"),
        }
    }

    fn values(&self) -> HashMap<&str, String> {
        let c = &self.client;
        HashMap::from([
            ("id", self.id.clone()),
            ("razao_social", c.razao_social.clone()),
            ("endereco", c.endereco.clone()),
            ("bairro", c.bairro.clone()),
            ("cidade", c.cidade.clone()),
            ("uf", c.uf.clone()),
            ("cep", c.cep.clone()),
            ("cnpj", c.cnpj.clone()),
            ("inscricao_estadual", c.inscricao_estadual.clone()),
            ("telefone", c.telefone.clone()),
            ("contato", c.contato.clone()),
            ("email", c.email.clone()),
            ("data_cadastro", self.data_cadastro.clone()),
        ])
    }
}

/// Product fields as entered when registering a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub sku: String,
    pub descricao: String,
    pub filme: String,
    pub cor_codigo: String,
    pub acabamento: String,
    pub medida: String,
    pub valor_kg: f64,
}

impl Product {
    /// A line item for `quantidade_kg` of this product at its list price.
    pub fn to_line_item(&self, quantidade_kg: f64, ipi_item: f64) -> LineItem {
        LineItem {
            descricao: self.descricao.clone(),
            filme: self.filme.clone(),
            cor_codigo: self.cor_codigo.clone(),
            acabamento: self.acabamento.clone(),
            medida: self.medida.clone(),
            quantidade_kg,
            valor_kg: self.valor_kg,
            ipi_item,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    pub id: String,
    #[serde(flatten)]
    pub product: Product,
    pub data_cadastro: String,
}

/// Spreadsheet number cell: `12.5`, `12,5`; anything else reads as 0.
fn parse_amount(cell: &str) -> f64 {
    let cell = cell.trim();
    cell.parse()
        .or_else(|_| cell.replace(',', ".").parse())
        .unwrap_or(0.0)
}

impl ProductRecord {
    fn from_record(r: &HashMap<&str, &str>) -> Self {
        let get = |k: &str| r.get(k).copied().unwrap_or("").to_string();
        Self {
            id: get("id"),
            product: Product {
                sku: get("sku"),
                descricao: get("descricao"),
                filme: get("filme"),
                cor_codigo: get("cor_codigo"),
                acabamento: get("acabamento"),
                medida: get("medida"),
                valor_kg: parse_amount(&get("valor_kg")),
            },
            data_cadastro: get("data_cadastro"),
        }
    }

    fn values(&self) -> HashMap<&str, String> {
        let p = &self.product;
        HashMap::from([
            ("id", self.id.clone()),
            ("sku", p.sku.clone()),
            ("descricao", p.descricao.clone()),
            ("filme", p.filme.clone()),
            ("cor_codigo", p.cor_codigo.clone()),
            ("acabamento", p.acabamento.clone()),
            ("medida", p.medida.clone()),
            ("valor_kg", format!("{:.2}", p.valor_kg)),
            ("data_cadastro", self.data_cadastro.clone()),
        ])
    }
}

/// Largest numeric id + 1, or 1 for an empty sheet.
fn next_id(sheet: &Worksheet, name: &str) -> Result<u64, StoreError> {
    let max = sheet
        .column_values(name, "id")?
        .into_iter()
        .filter_map(|id| id.trim().parse::<u64>().ok())
        .max();
    Ok(max.map_or(1, |m| m + 1))
}

fn ensure_unique(
    sheet: &Worksheet,
    name: &str,
    column: &'static str,
    value: &str,
) -> Result<(), StoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }
    if sheet
        .column_values(name, column)?
        .iter()
        .any(|existing| existing.trim() == value)
    {
        return Err(StoreError::Duplicate {
            column,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Typed access to the client and product tabs of a workbook.
pub struct Catalog<W: Workbook> {
    book: W,
    clients: Option<Vec<ClientRecord>>,
    products: Option<Vec<ProductRecord>>,
}

impl Catalog<JsonWorkbook> {
    /// Open (or create) a JSON workbook with both tabs present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let mut book = JsonWorkbook::open(path)?;
        book.ensure_sheet(CLIENTS_SHEET, &CLIENT_COLUMNS)?;
        book.ensure_sheet(PRODUCTS_SHEET, &PRODUCT_COLUMNS)?;
        Ok(Self::new(book))
    }
}

impl<W: Workbook> Catalog<W> {
    pub fn new(book: W) -> Self {
        Self {
            book,
            clients: None,
            products: None,
        }
    }

    pub fn workbook(&self) -> &W {
        &self.book
    }

    /// Drop cached reads so the next listing rereads the workbook.
    pub fn invalidate(&mut self) {
        self.clients = None;
        self.products = None;
    }

    /// Records of `sheet`; a missing tab reads as empty.
    fn load<T>(&self, sheet: &str, from: fn(&HashMap<&str, &str>) -> T) -> Vec<T> {
        match self.book.worksheet(sheet) {
            Ok(ws) => ws.records().iter().map(from).collect(),
            Err(e) => {
                log::warn!("Reading '{sheet}': {e}");
                Vec::new()
            }
        }
    }

    pub fn list_clients(&mut self) -> &[ClientRecord] {
        if self.clients.is_none() {
            self.clients = Some(self.load(CLIENTS_SHEET, ClientRecord::from_record));
        }
        self.clients.as_deref().unwrap_or_default()
    }

    pub fn client_by_id(&mut self, id: &str) -> Option<ClientRecord> {
        let id = id.trim();
        self.list_clients().iter().find(|c| c.id == id).cloned()
    }

    /// Register a client. `cnpj` must be unique among non-empty values.
    pub fn add_client(
        &mut self,
        client: Client,
        registered_on: NaiveDate,
    ) -> Result<ClientRecord, StoreError> {
        if client.razao_social.trim().is_empty() {
            return Err(StoreError::MissingField("razao_social"));
        }
        if client.cnpj.trim().is_empty() {
            return Err(StoreError::MissingField("cnpj"));
        }
        let sheet = self.book.worksheet(CLIENTS_SHEET)?;
        ensure_unique(sheet, CLIENTS_SHEET, "cnpj", &client.cnpj)?;
        let record = ClientRecord {
            id: next_id(sheet, CLIENTS_SHEET)?.to_string(),
            client,
            data_cadastro: registered_on.format("%Y-%m-%d").to_string(),
        };
        let row = sheet.row_from(&record.values());
        self.book.append_row(CLIENTS_SHEET, row)?;
        log::info!("Registered client {} ({})", record.id, record.client.razao_social);

        if let Some(cache) = &mut self.clients {
            cache.push(record.clone());
        }
        Ok(record)
    }

    pub fn list_products(&mut self) -> &[ProductRecord] {
        if self.products.is_none() {
            self.products = Some(self.load(PRODUCTS_SHEET, ProductRecord::from_record));
        }
        self.products.as_deref().unwrap_or_default()
    }

    pub fn product_by_id(&mut self, id: &str) -> Option<ProductRecord> {
        let id = id.trim();
        self.list_products().iter().find(|p| p.id == id).cloned()
    }

    /// Register a product. `sku` must be unique among non-empty values.
    pub fn add_product(
        &mut self,
        product: Product,
        registered_on: NaiveDate,
    ) -> Result<ProductRecord, StoreError> {
        if product.sku.trim().is_empty() {
            return Err(StoreError::MissingField("sku"));
        }
        if product.descricao.trim().is_empty() {
            return Err(StoreError::MissingField("descricao"));
        }
        let sheet = self.book.worksheet(PRODUCTS_SHEET)?;
        ensure_unique(sheet, PRODUCTS_SHEET, "sku", &product.sku)?;
        let record = ProductRecord {
            id: next_id(sheet, PRODUCTS_SHEET)?.to_string(),
            product,
            data_cadastro: registered_on.format("%Y-%m-%d").to_string(),
        };
        let row = sheet.row_from(&record.values());
        self.book.append_row(PRODUCTS_SHEET, row)?;
        log::info!("Registered product {} ({})", record.id, record.product.sku);

        if let Some(cache) = &mut self.products {
            cache.push(record.clone());
        }
        Ok(record)
    }
}
