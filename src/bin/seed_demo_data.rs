use chrono::{Duration, Local, NaiveDateTime, Utc};
use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use logistics_reporting::app::get_default_db_path;
use logistics_reporting::db::{init_schema, open_sqlite_connection};
use logistics_reporting::domain::{
    Contact, ContactRole, Location, LocationType, Product, ProductType, ReportType, SupplyPoint,
    REPORTEE_RESPONSIBILITY,
};
use logistics_reporting::engine::ReportingRepositories;
use logistics_reporting::repository::ContactRepository;
use logistics_reporting::sms::ProductReportsHelper;

const DEFAULT_WEEKS: i64 = 12;

// (code, name, type, parent)
const LOCATIONS: &[(&str, &str, &str, Option<&str>)] = &[
    ("GH", "Ghana", "country", None),
    ("GAR", "Greater Accra", "region", Some("GH")),
    ("ASH", "Ashanti", "region", Some("GH")),
    ("ACC", "Accra Metro", "district", Some("GAR")),
    ("TEM", "Tema", "district", Some("GAR")),
    ("KUM", "Kumasi Metro", "district", Some("ASH")),
];

// (code, name, district)
const FACILITIES: &[(&str, &str, &str)] = &[
    ("RIDGE", "Ridge Hospital", "ACC"),
    ("KBTH", "Korle Bu", "ACC"),
    ("TEMG", "Tema General", "TEM"),
    ("TEMP", "Tema Polyclinic", "TEM"),
    ("KATH", "Komfo Anokye", "KUM"),
    ("MANH", "Manhyia Hospital", "KUM"),
];

// (sms_code, name, program, monthly consumption)
const PRODUCTS: &[(&str, &str, &str, f64)] = &[
    ("jd", "Jadelle", "fp", 40.0),
    ("dp", "Depo-Provera", "fp", 120.0),
    ("mc", "Male Condom", "fp", 600.0),
    ("al", "Artemether-Lumefantrine", "malaria", 300.0),
];

fn main() -> Result<(), Box<dyn Error>> {
    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(get_default_db_path);
    let weeks = std::env::args()
        .nth(2)
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(DEFAULT_WEEKS)
        .max(1);

    backup_and_reset_db(&db_path)?;

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;
    let conn = Arc::new(Mutex::new(conn));
    let repos = ReportingRepositories::from_connection(conn.clone());
    let contact_repo = ContactRepository::new(conn);

    let now = Utc::now().naive_utc();
    seed_master_data(&repos, &contact_repo, now)?;
    let reports = seed_reports(&repos, now, weeks)?;

    eprintln!(
        "Seeded {} locations, {} facilities, {} products, {} reports into {}",
        LOCATIONS.len(),
        FACILITIES.len(),
        PRODUCTS.len(),
        reports,
        db_path
    );
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn seed_master_data(
    repos: &ReportingRepositories,
    contact_repo: &ContactRepository,
    now: NaiveDateTime,
) -> Result<(), Box<dyn Error>> {
    for (order, code) in ["country", "region", "district"].iter().enumerate() {
        repos.location_repo.upsert_type(&LocationType {
            code: code.to_string(),
            name: code.to_string(),
            display_order: Some(order as i32),
        })?;
    }
    for (code, name, type_code, parent) in LOCATIONS {
        repos
            .location_repo
            .upsert(&Location::new(code, name, type_code, *parent))?;
    }

    for program in ["fp", "malaria"] {
        repos.product_repo.upsert_type(&ProductType {
            code: program.to_string(),
            name: program.to_uppercase(),
        })?;
    }
    for (code, name, program, amc) in PRODUCTS {
        let mut product = Product::new(code, name, Some(program));
        product.average_monthly_consumption = Some(*amc);
        repos.product_repo.upsert(&product)?;
    }

    for (i, (code, name, district)) in FACILITIES.iter().enumerate() {
        repos
            .supply_point_repo
            .upsert(&SupplyPoint::new(code, name, district))?;
        for (product_code, ..) in PRODUCTS {
            repos
                .product_stock_repo
                .set_active(code, product_code, true, now)?;
        }

        // 最后一个站点不登记上报人，便于演示告警
        if i + 1 == FACILITIES.len() {
            continue;
        }
        contact_repo.upsert(&Contact {
            id: 0,
            name: format!("{} reporter", name),
            phone: format!("+23320000{:04}", i),
            supply_point_code: Some(code.to_string()),
            role: Some(ContactRole {
                code: "facility_in_charge".to_string(),
                responsibilities: vec!["reporter".to_string()],
            }),
            needs_reminders: i % 2 == 0,
            is_active: true,
        })?;
    }

    contact_repo.upsert(&Contact {
        id: 0,
        name: "Accra supervisor".to_string(),
        phone: "+233209999000".to_string(),
        supply_point_code: Some("RIDGE".to_string()),
        role: Some(ContactRole {
            code: "dhio".to_string(),
            responsibilities: vec![REPORTEE_RESPONSIBILITY.to_string()],
        }),
        needs_reminders: false,
        is_active: true,
    })?;
    Ok(())
}

/// 每周一次库存与消耗上报；部分站点周期性漏报
fn seed_reports(
    repos: &ReportingRepositories,
    now: NaiveDateTime,
    weeks: i64,
) -> Result<usize, Box<dyn Error>> {
    let mut count = 0;
    for week in (0..weeks).rev() {
        let at = now - Duration::weeks(week) - Duration::hours(3);
        for (i, (code, ..)) in FACILITIES.iter().enumerate() {
            if (week + i as i64) % (i as i64 + 2) == 1 {
                continue;
            }
            let mut helper = ProductReportsHelper::new(code, ReportType::StockOnHand, None);
            for (j, (product_code, _, _, amc)) in PRODUCTS.iter().enumerate() {
                let spread = ((i * 7 + j * 3) as i64 + week) % 9;
                let quantity = if spread == 0 { 0 } else { (*amc as i64) * spread / 3 };
                helper.add_stock(product_code, quantity);
                helper.add_consumption(product_code, (*amc as i64) / 4);
            }
            count += helper.save(repos, at)?.len();
        }
    }
    Ok(count)
}
