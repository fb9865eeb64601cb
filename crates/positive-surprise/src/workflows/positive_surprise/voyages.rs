use std::collections::{BTreeSet, HashMap, HashSet};

use super::domain::{parse_sail_date, Table, TableError, Voyage, VoyageKey, VoyageListing};

/// Normalizes the upcoming voyage result: upper-cased ship and department,
/// one entry per (sail date, ship, department), ordered by ship name.
pub fn unique_voyage_list(table: &Table) -> Result<Vec<VoyageListing>, TableError> {
    table.require_column("SAIL_DATE")?;
    table.require_column("SHIP_NAME")?;
    table.require_column("DEPARTMENT")?;

    let mut seen = HashSet::new();
    let mut listing = Vec::new();

    for row in table.rows() {
        let raw_date = row.text("SAIL_DATE")?;
        let entry = VoyageListing {
            sail_date: parse_sail_date("SAIL_DATE", &raw_date)?,
            ship_name: row.text("SHIP_NAME")?.trim().to_uppercase(),
            department: row.text("DEPARTMENT")?.trim().to_uppercase(),
        };
        if seen.insert(entry.clone()) {
            listing.push(entry);
        }
    }

    listing.sort_by(|left, right| left.ship_name.cmp(&right.ship_name));
    Ok(listing)
}

/// Groups listing rows into voyages keyed by (ship, sail date), keeping the
/// order in which each voyage first appears.
pub fn group_voyages(listing: &[VoyageListing]) -> Vec<Voyage> {
    let mut positions: HashMap<VoyageKey, usize> = HashMap::new();
    let mut voyages: Vec<Voyage> = Vec::new();

    for entry in listing {
        let key = VoyageKey {
            ship_name: entry.ship_name.clone(),
            sail_date: entry.sail_date,
        };
        let index = *positions.entry(key.clone()).or_insert_with(|| {
            voyages.push(Voyage::new(key));
            voyages.len() - 1
        });
        voyages[index].add_department(&entry.department);
    }

    voyages
}

/// Distinct ship names in alphabetical order.
pub fn distinct_ships(listing: &[VoyageListing]) -> Vec<String> {
    listing
        .iter()
        .map(|entry| entry.ship_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn voyage_table(rows: &[(&str, &str, &str, &str)]) -> Table {
        let mut table = Table::new(["VOYAGE", "SHIP_NAME", "SAIL_DATE", "DEPARTMENT"]);
        for (voyage, ship, date, department) in rows {
            table
                .push_row(vec![
                    Some(voyage.to_string()),
                    Some(ship.to_string()),
                    Some(date.to_string()),
                    Some(department.to_string()),
                ])
                .expect("row fits");
        }
        table
    }

    #[test]
    fn listing_is_deduplicated_case_insensitively_and_sorted_by_ship() {
        let table = voyage_table(&[
            ("z610", "Zuiderdam", "2026-10-24", "Spa"),
            ("z610", "ZUIDERDAM", "2026-10-24", "SPA"),
            ("e611", "Eurodam", "2026-10-25", "casino"),
            ("z610", "zuiderdam", "2026-10-24", "Cabin"),
            ("e611", "Eurodam", "2026-10-25", "Casino"),
        ]);

        let listing = unique_voyage_list(&table).expect("listing builds");
        assert_eq!(listing.len(), 3);

        let ships: Vec<_> = listing.iter().map(|entry| entry.ship_name.as_str()).collect();
        assert_eq!(ships, ["EURODAM", "ZUIDERDAM", "ZUIDERDAM"]);

        let unique: HashSet<_> = listing.iter().collect();
        assert_eq!(unique.len(), listing.len());
        assert!(listing
            .iter()
            .all(|entry| entry.department == entry.department.to_uppercase()));
    }

    #[test]
    fn grouping_keeps_one_voyage_per_ship_and_date() {
        let table = voyage_table(&[
            ("z610", "ZUIDERDAM", "2026-10-24", "SPA"),
            ("z610", "ZUIDERDAM", "2026-10-24", "CASINO"),
            ("z617", "ZUIDERDAM", "2026-10-31", "SPA"),
            ("e611", "EURODAM", "2026-10-25", "SPA"),
        ]);
        let listing = unique_voyage_list(&table).expect("listing builds");
        let voyages = group_voyages(&listing);

        assert_eq!(voyages.len(), 3);
        assert_eq!(voyages[0].key.ship_name, "EURODAM");
        let first_zuiderdam = voyages
            .iter()
            .find(|voyage| {
                voyage.key.sail_date == NaiveDate::from_ymd_opt(2026, 10, 24).unwrap()
            })
            .expect("voyage present");
        assert_eq!(first_zuiderdam.departments(), ["spa", "casino"]);
    }

    #[test]
    fn missing_department_column_is_reported() {
        let mut table = Table::new(["SHIP_NAME", "SAIL_DATE"]);
        table
            .push_row(vec![Some("EURODAM".into()), Some("2026-10-25".into())])
            .expect("row fits");
        assert_eq!(
            unique_voyage_list(&table).expect_err("department required"),
            TableError::MissingColumn("DEPARTMENT".to_string())
        );
    }

    #[test]
    fn distinct_ships_are_sorted() {
        let table = voyage_table(&[
            ("z610", "ZUIDERDAM", "2026-10-24", "SPA"),
            ("k600", "KONINGSDAM", "2026-10-24", "SPA"),
            ("z617", "ZUIDERDAM", "2026-10-31", "SPA"),
        ]);
        let listing = unique_voyage_list(&table).expect("listing builds");
        assert_eq!(distinct_ships(&listing), ["KONINGSDAM", "ZUIDERDAM"]);
    }
}
