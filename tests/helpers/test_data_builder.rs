// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================
// 标准位置树:
//   GH (country)
//   ├─ GAR (region)
//   │  ├─ ACC (district): RIDGE, KBTH
//   │  └─ TEM (district): TEMG
//   └─ ASH (region)
//      └─ KUM (district): KATH
// 产品: jd / mc (fp)，al (malaria)；全部站点在用全部产品
// ==========================================

#![allow(dead_code)]

use chrono::NaiveDateTime;
use logistics_reporting::domain::{
    Contact, ContactRole, Location, LocationType, Product, ProductReport, ProductType, ReportType,
    SupplyPoint, REPORTEE_RESPONSIBILITY,
};
use logistics_reporting::engine::ReportingRepositories;
use logistics_reporting::repository::ContactRepository;
use logistics_reporting::sms::ProductReportsHelper;
use std::error::Error;

pub type BuildResult<T> = Result<T, Box<dyn Error>>;

pub const RIDGE_PHONE: &str = "+233200000001";
pub const KBTH_PHONE: &str = "+233200000002";
pub const TEMG_PHONE: &str = "+233200000003";
pub const SUPERVISOR_PHONE: &str = "+233209999000";

pub const ALL_FACILITIES: [&str; 4] = ["RIDGE", "KBTH", "TEMG", "KATH"];

// ==========================================
// Product 构建器
// ==========================================

pub struct ProductBuilder {
    product: Product,
}

impl ProductBuilder {
    pub fn new(sms_code: &str) -> Self {
        Self {
            product: Product::new(sms_code, sms_code, None),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.product.name = name.to_string();
        self
    }

    pub fn program(mut self, type_code: &str) -> Self {
        self.product.type_code = Some(type_code.to_string());
        self
    }

    pub fn monthly_consumption(mut self, amc: f64) -> Self {
        self.product.average_monthly_consumption = Some(amc);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.product.is_active = false;
        self
    }

    pub fn build(self) -> Product {
        self.product
    }
}

// ==========================================
// Contact 构建器
// ==========================================

pub struct ContactBuilder {
    contact: Contact,
}

impl ContactBuilder {
    pub fn new(name: &str, phone: &str) -> Self {
        Self {
            contact: Contact {
                id: 0,
                name: name.to_string(),
                phone: phone.to_string(),
                supply_point_code: None,
                role: None,
                needs_reminders: false,
                is_active: true,
            },
        }
    }

    pub fn facility(mut self, code: &str) -> Self {
        self.contact.supply_point_code = Some(code.to_string());
        self
    }

    pub fn reporter(mut self) -> Self {
        self.contact.role = Some(ContactRole {
            code: "facility_in_charge".to_string(),
            responsibilities: vec!["reporter".to_string()],
        });
        self
    }

    pub fn supervisor(mut self) -> Self {
        self.contact.role = Some(ContactRole {
            code: "dhio".to_string(),
            responsibilities: vec![REPORTEE_RESPONSIBILITY.to_string()],
        });
        self
    }

    pub fn needs_reminders(mut self) -> Self {
        self.contact.needs_reminders = true;
        self
    }

    pub fn build(self) -> Contact {
        self.contact
    }
}

// ==========================================
// 标准数据集
// ==========================================

pub fn seed_location_tree(repos: &ReportingRepositories) -> BuildResult<()> {
    for (order, code) in ["country", "region", "district"].iter().enumerate() {
        repos.location_repo.upsert_type(&LocationType {
            code: code.to_string(),
            name: code.to_string(),
            display_order: Some(order as i32 + 1),
        })?;
    }
    for location in [
        Location::new("GH", "Ghana", "country", None),
        Location::new("GAR", "Greater Accra", "region", Some("GH")),
        Location::new("ASH", "Ashanti", "region", Some("GH")),
        Location::new("ACC", "Accra Metro", "district", Some("GAR")),
        Location::new("TEM", "Tema", "district", Some("GAR")),
        Location::new("KUM", "Kumasi Metro", "district", Some("ASH")),
    ] {
        repos.location_repo.upsert(&location)?;
    }
    for facility in [
        SupplyPoint::new("RIDGE", "Ridge Hospital", "ACC"),
        SupplyPoint::new("KBTH", "Korle Bu", "ACC"),
        SupplyPoint::new("TEMG", "Tema General", "TEM"),
        SupplyPoint::new("KATH", "Komfo Anokye", "KUM"),
    ] {
        repos.supply_point_repo.upsert(&facility)?;
    }
    Ok(())
}

pub fn seed_products(repos: &ReportingRepositories, now: NaiveDateTime) -> BuildResult<()> {
    for (code, name) in [("fp", "Family Planning"), ("malaria", "Malaria")] {
        repos.product_repo.upsert_type(&ProductType {
            code: code.to_string(),
            name: name.to_string(),
        })?;
    }
    for product in [
        ProductBuilder::new("jd").name("Jadelle").program("fp").monthly_consumption(40.0),
        ProductBuilder::new("mc").name("Male Condom").program("fp").monthly_consumption(600.0),
        ProductBuilder::new("al").name("Artemether-Lumefantrine").program("malaria").monthly_consumption(300.0),
    ] {
        repos.product_repo.upsert(&product.build())?;
    }
    for facility in ALL_FACILITIES {
        for product in ["jd", "mc", "al"] {
            repos
                .product_stock_repo
                .set_active(facility, product, true, now)?;
        }
    }
    Ok(())
}

/// KATH 没有上报人；KBTH 上报人不需要提醒
pub fn seed_contacts(contact_repo: &ContactRepository) -> BuildResult<()> {
    for contact in [
        ContactBuilder::new("Ama", RIDGE_PHONE).facility("RIDGE").reporter().needs_reminders(),
        ContactBuilder::new("Kofi", KBTH_PHONE).facility("KBTH").reporter(),
        ContactBuilder::new("Esi", TEMG_PHONE).facility("TEMG").reporter().needs_reminders(),
        ContactBuilder::new("Supervisor", SUPERVISOR_PHONE).facility("RIDGE").supervisor(),
    ] {
        contact_repo.upsert(&contact.build())?;
    }
    Ok(())
}

/// 位置树 + 产品 + 上报人
pub fn seed_standard(
    repos: &ReportingRepositories,
    contact_repo: &ContactRepository,
    now: NaiveDateTime,
) -> BuildResult<()> {
    seed_location_tree(repos)?;
    seed_products(repos, now)?;
    seed_contacts(contact_repo)
}

// ==========================================
// 上报
// ==========================================

pub fn report(
    repos: &ReportingRepositories,
    facility: &str,
    report_type: ReportType,
    quantities: &[(&str, i64)],
    at: NaiveDateTime,
) -> BuildResult<Vec<ProductReport>> {
    let mut helper = ProductReportsHelper::new(facility, report_type, None);
    for (code, quantity) in quantities {
        match report_type {
            ReportType::Receipt => helper.add_receipt(code, *quantity),
            ReportType::Consumption => helper.add_consumption(code, *quantity),
            _ => helper.add_stock(code, *quantity),
        }
    }
    Ok(helper.save(repos, at)?)
}

pub fn report_soh(
    repos: &ReportingRepositories,
    facility: &str,
    quantities: &[(&str, i64)],
    at: NaiveDateTime,
) -> BuildResult<Vec<ProductReport>> {
    report(repos, facility, ReportType::StockOnHand, quantities, at)
}
