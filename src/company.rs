//! Issuing company presets.

use crate::quotation::Company;

/// Letterhead data of a company that can issue quotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanyProfile {
    pub key: &'static str,
    pub nome: &'static str,
    pub endereco: &'static str,
    pub bairro_cidade_uf: &'static str,
    pub cep: &'static str,
    pub contato: &'static str,
    /// Logo file name searched by the asset resolver.
    pub logo_hint: &'static str,
}

pub const ISOFORMA: CompanyProfile = CompanyProfile {
    key: "ISOFORMA",
    nome: "ISOFORMA PLÁSTICOS INDÚSTRIAIS LTDA",
    endereco: "RODOVIA DOM GABRIEL PAULINO BUENO COUTO, SN",
    bairro_cidade_uf: "Bairro Pinhal - Cabreúva - SP",
    cep: "13317-204",
    contato: "(11) 4409-0919",
    logo_hint: "logo_isoforma.png",
};

pub const PLASTY: CompanyProfile = CompanyProfile {
    key: "PLASTY",
    nome: "PLASTY COMERCIAL DE PLÁSTICOS LTDA",
    endereco: "RUA CARLOS SILVEIRA FRANCO NETO, 77",
    bairro_cidade_uf: "Bairro do Jacaré - Cabreúva - SP",
    cep: "13318-000",
    contato: "(11) 4409-0919",
    logo_hint: "logo_plasty.png",
};

pub const PRESETS: [CompanyProfile; 2] = [ISOFORMA, PLASTY];

impl CompanyProfile {
    /// Case-insensitive lookup by key.
    pub fn lookup(key: &str) -> Option<CompanyProfile> {
        let key = key.trim();
        PRESETS
            .iter()
            .find(|p| p.key.eq_ignore_ascii_case(key))
            .copied()
    }

    /// Header data without an embedded logo.
    pub fn to_company(&self) -> Company {
        Company {
            nome: self.nome.to_string(),
            endereco: self.endereco.to_string(),
            bairro_cidade_uf: self.bairro_cidade_uf.to_string(),
            cep: self.cep.to_string(),
            contato: self.contato.to_string(),
            logo_path: self.logo_hint.to_string(),
            logo_base64: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case_and_whitespace() {
        assert_eq!(CompanyProfile::lookup("isoforma"), Some(ISOFORMA));
        assert_eq!(CompanyProfile::lookup(" Plasty "), Some(PLASTY));
        assert_eq!(CompanyProfile::lookup("acme"), None);
    }

    #[test]
    fn company_carries_logo_hint() {
        let company = PLASTY.to_company();
        assert_eq!(company.cep, "13318-000");
        assert_eq!(company.logo_path, "logo_plasty.png");
        assert!(company.logo_base64.is_none());
    }
}
