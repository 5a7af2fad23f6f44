//! Provider directory listing.

use carebook_api::SchedulingApi;
use carebook_core::{DoctorQuery, Provider};

use crate::error::ClientResult;

/// Fetches providers matching `query`; with `all`, follows every page.
pub async fn fetch(
    api: &dyn SchedulingApi,
    query: DoctorQuery,
    all: bool,
) -> ClientResult<Vec<Provider>> {
    let mut page = api.list_doctors(query.clone()).await?;
    let mut doctors = std::mem::take(&mut page.doctors);

    while all && page.has_more {
        let Some(token) = page.next_page_token.take() else {
            break;
        };
        page = api.list_doctors(query.clone().with_page_token(token)).await?;
        doctors.append(&mut page.doctors);
    }
    Ok(doctors)
}

/// One line per provider, with its appointment types indented below.
pub fn render(doctors: &[Provider]) -> String {
    if doctors.is_empty() {
        return "No providers found.".to_string();
    }

    let mut lines = Vec::new();
    for doctor in doctors {
        let mut line = format!("{}  {}", doctor.id, doctor.name);
        if let Some(ref address) = doctor.address {
            line.push_str(&format!(" ({})", address));
        }
        if doctor.calendar_id.is_none() {
            line.push_str(" [no online booking]");
        }
        lines.push(line);

        for kind in &doctor.appointment_types {
            let mut line = format!(
                "    {}  {} [{}] {} min",
                kind.id, kind.name, kind.category, kind.duration_minutes
            );
            if let Some(price) = kind.price {
                line.push_str(&format!(" ${:.2}", price));
            }
            lines.push(line);
        }
    }
    lines.join("\n")
}

/// `carebook doctors`
pub async fn run(
    api: &dyn SchedulingApi,
    search: Option<String>,
    location: Option<String>,
    all: bool,
    json: bool,
) -> ClientResult<()> {
    let mut query = DoctorQuery::new();
    if let Some(search) = search {
        query = query.with_search(search);
    }
    if let Some(location) = location {
        query = query.with_location(location);
    }

    let doctors = fetch(api, query, all).await?;
    if json {
        return super::print_json(&doctors);
    }
    println!("{}", render(&doctors));
    Ok(())
}
