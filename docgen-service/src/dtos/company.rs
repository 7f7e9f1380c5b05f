use crate::models::{Company, UpdateCompany};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Company settings update. All fields optional; absent fields are left
/// unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCompanyRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub address: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(url)]
    pub logo_url: Option<String>,
    pub inbound_channel_id: Option<String>,
}

impl From<UpdateCompanyRequest> for UpdateCompany {
    fn from(req: UpdateCompanyRequest) -> Self {
        UpdateCompany {
            name: req.name,
            address: req.address,
            phone: req.phone,
            email: req.email,
            logo_url: req.logo_url,
            inbound_channel_id: req.inbound_channel_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompanyResponse {
    pub company_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub logo_url: Option<String>,
    pub inbound_channel_id: Option<String>,
    pub subscription_plan: String,
    pub subscription_active: bool,
    pub documents_used_this_month: i64,
}

impl From<Company> for CompanyResponse {
    fn from(company: Company) -> Self {
        Self {
            company_id: company.company_id,
            name: company.name,
            address: company.address,
            phone: company.phone,
            email: company.email,
            logo_url: company.logo_url,
            inbound_channel_id: company.inbound_channel_id,
            subscription_plan: company.subscription_plan,
            subscription_active: company.subscription_active,
            documents_used_this_month: company.documents_used_this_month,
        }
    }
}
