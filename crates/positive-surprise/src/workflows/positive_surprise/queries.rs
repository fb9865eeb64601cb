//! Warehouse statements issued by the job. Scoping values are always bound
//! positionally, never interpolated into the SQL text.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub name: &'static str,
    pub sql: String,
    pub bindings: Vec<String>,
    pub multi_statement: bool,
}

impl Query {
    fn single(name: &'static str, sql: &str, bindings: Vec<String>) -> Self {
        Self {
            name,
            sql: sql.trim().to_string(),
            bindings,
            multi_statement: false,
        }
    }
}

pub const POSITIVE_SURPRISE_EXECUTION: &str = "positive_surprise_execution";
pub const UPCOMING_VOYAGES: &str = "upcoming_voyages";
pub const VOYAGE_DEPARTMENT_DATA: &str = "voyage_department_data";
pub const VOYAGE_SPA_PRINT_DATA: &str = "voyage_spa_print_data";
pub const VOYAGE_CABIN_PRINT_DATA: &str = "voyage_cabin_print_data";
pub const VOYAGE_TEST_HISTORY_DATA: &str = "voyage_test_history_data";
pub const VOYAGE_PUSH_NOTIFICATIONS_DATA: &str = "voyage_push_notifications_data";

/// Daily qualification run; refreshes the offer tables and returns the
/// qualified guest list from the final statement.
pub fn positive_surprise_execution() -> Query {
    Query {
        name: POSITIVE_SURPRISE_EXECUTION,
        sql: "CALL POSITIVE_SURPRISE.SP_QUALIFY_HAL_GUESTS();\n\
              SELECT * FROM POSITIVE_SURPRISE.HAL_QUALIFIED_GUESTS WHERE RUN_DATE = CURRENT_DATE();"
            .to_string(),
        bindings: Vec::new(),
        multi_statement: true,
    }
}

pub fn upcoming_voyages() -> Query {
    Query::single(
        UPCOMING_VOYAGES,
        r#"
SELECT DISTINCT VOYAGE, SHIP_NAME, SAIL_DATE, DEPARTMENT
FROM POSITIVE_SURPRISE.HAL_QUALIFIED_GUESTS
WHERE RUN_DATE = CURRENT_DATE()
ORDER BY SHIP_NAME, SAIL_DATE, DEPARTMENT
"#,
        Vec::new(),
    )
}

pub fn voyage_department_data(ship_name: &str, sail_date: NaiveDate, department: &str) -> Query {
    Query::single(
        VOYAGE_DEPARTMENT_DATA,
        r#"
SELECT SHIP_NAME, SAIL_DATE, CABIN, NAME, OFFER, OFFER_GIFT_CARD, TC, LOCATION,
       HOUSEKEEP_SECTION, EXPIRATION_DATE
FROM POSITIVE_SURPRISE.HAL_DEPARTMENT_OFFERS
WHERE UPPER(SHIP_NAME) = UPPER(?)
  AND SAIL_DATE = TO_DATE(?)
  AND UPPER(DEPARTMENT) = UPPER(?)
ORDER BY CABIN
"#,
        vec![
            ship_name.to_string(),
            sail_date.format("%Y-%m-%d").to_string(),
            department.to_string(),
        ],
    )
}

pub fn voyage_spa_print_data(ship_name: &str, sail_date: NaiveDate) -> Query {
    Query::single(
        VOYAGE_SPA_PRINT_DATA,
        r#"
SELECT CABIN, NAME, OFFER_GIFT_CARD, OFFER, TC, LOCATION, SHIP_NAME, SAIL_DATE,
       HOUSEKEEP_SECTION, EXPIRATION_DATE
FROM POSITIVE_SURPRISE.HAL_SPA_PRINT
WHERE UPPER(SHIP_NAME) = UPPER(?)
  AND SAIL_DATE = TO_DATE(?)
ORDER BY HOUSEKEEP_SECTION, CABIN
"#,
        voyage_bindings(ship_name, sail_date),
    )
}

pub fn voyage_cabin_print_data(ship_name: &str, sail_date: NaiveDate) -> Query {
    Query::single(
        VOYAGE_CABIN_PRINT_DATA,
        r#"
SELECT CABIN, NAME, HEADER,
       OFFER1_GIFT_CARD, OFFER1, TC1, LOCATION1,
       OFFER2_GIFT_CARD, OFFER2, TC2, EXPIRATION_DATE2, NAME2, CABIN2, LOCATION2,
       SHIP_NAME2, SAIL_DATE2, HOUSEKEEP_SECTION2,
       EXPIRATION_DATE, SHIP_NAME, SAIL_DATE, HOUSEKEEP_SECTION
FROM POSITIVE_SURPRISE.HAL_CABIN_PRINT
WHERE UPPER(SHIP_NAME) = UPPER(?)
  AND SAIL_DATE = TO_DATE(?)
ORDER BY HOUSEKEEP_SECTION, CABIN
"#,
        voyage_bindings(ship_name, sail_date),
    )
}

pub fn voyage_test_history_data(ship_name: &str, sail_date: NaiveDate) -> Query {
    Query::single(
        VOYAGE_TEST_HISTORY_DATA,
        r#"
SELECT SHIP_NAME, SAIL_DATE, CABIN, NAME, DEPARTMENT, OFFER, TEST_GROUP, EXPIRATION_DATE
FROM POSITIVE_SURPRISE.HAL_TEST_HISTORY
WHERE UPPER(SHIP_NAME) = UPPER(?)
  AND SAIL_DATE = TO_DATE(?)
ORDER BY DEPARTMENT, CABIN
"#,
        voyage_bindings(ship_name, sail_date),
    )
}

pub fn voyage_push_notifications_data() -> Query {
    Query::single(
        VOYAGE_PUSH_NOTIFICATIONS_DATA,
        r#"
SELECT SHIP_NAME, SHIP_CODE, VOYAGE, SAIL_DATE, RETURN_DATE, FIRST_NAME, LAST_NAME,
       BKNG_NBR, PARTY_ID, FIDELIO_NUMBER, LOYALTY_ID, CABIN, OFFER_DEPT, OFFER_CODE,
       OFFER, OFFERTITLE, OFFER_MESSAGE, CARD_TEMPLATE, AMOUNT, DELIVERY_DATE,
       DELIVERY_TIME, EXPIRATION_DATE, TERMS, LOCATION
FROM POSITIVE_SURPRISE.HAL_APP_NOTIFICATIONS
WHERE RUN_DATE = CURRENT_DATE()
ORDER BY SHIP_NAME, CABIN
"#,
        Vec::new(),
    )
}

fn voyage_bindings(ship_name: &str, sail_date: NaiveDate) -> Vec<String> {
    vec![
        ship_name.to_string(),
        sail_date.format("%Y-%m-%d").to_string(),
    ]
}
