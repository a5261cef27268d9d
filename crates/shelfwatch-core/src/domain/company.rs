use serde::Serialize;

use super::{ListingCode, ProductRecord};

/// Records per company, in configured order: tracked company first, then
/// competitors by index. Records keep configured URL order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompanyGroup {
    companies: Vec<(String, Vec<ProductRecord>)>,
}

impl CompanyGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a company with no records yet. Re-registering keeps position.
    pub fn ensure_company(&mut self, company: &str) {
        if !self.companies.iter().any(|(name, _)| name == company) {
            self.companies.push((company.to_owned(), Vec::new()));
        }
    }

    pub fn push(&mut self, company: &str, record: ProductRecord) {
        self.ensure_company(company);
        if let Some((_, records)) = self
            .companies
            .iter_mut()
            .find(|(name, _)| name == company)
        {
            records.push(record);
        }
    }

    pub fn records(&self, company: &str) -> &[ProductRecord] {
        self.companies
            .iter()
            .find(|(name, _)| name == company)
            .map(|(_, records)| records.as_slice())
            .unwrap_or(&[])
    }

    pub fn find(&self, company: &str, listing: &ListingCode) -> Option<&ProductRecord> {
        self.records(company)
            .iter()
            .find(|record| &record.listing_id == listing)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ProductRecord])> {
        self.companies
            .iter()
            .map(|(name, records)| (name.as_str(), records.as_slice()))
    }

    pub fn record_count(&self) -> usize {
        self.companies.iter().map(|(_, records)| records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}
