//! Fixed controls of the Agmarknet commodity/market search form.

use chrono::{Duration, NaiveDate};

use super::browser::Locator;

pub const TARGET_URL: &str = "https://agmarknet.gov.in/SearchCmmMkt.aspx";

pub const COMMODITY_SELECT: Locator = Locator::Id("ddlCommodity");
pub const STATE_SELECT: Locator = Locator::Id("ddlState");
pub const MARKET_SELECT: Locator = Locator::Id("ddlMarket");
pub const DATE_INPUT: Locator = Locator::Id("txtDate");
pub const GO_BUTTON: Locator = Locator::Id("btnGo");

pub const RESULTS_TABLE_ID: &str = "cphBody_GridPriceData";
pub const RESULTS_TABLE: Locator = Locator::Id(RESULTS_TABLE_ID);

pub const POPUP: Locator = Locator::Class("popup-onload");
pub const POPUP_CLOSE: Locator = Locator::Css(".popup-onload .close");

/// Source data is published with a lag of about a week.
pub const REPORT_LAG_DAYS: i64 = 7;

/// The date written into the form: `today` minus the reporting lag, as
/// `DD-Mon-YYYY`.
pub fn report_date(today: NaiveDate) -> String {
    (today - Duration::days(REPORT_LAG_DAYS))
        .format("%d-%b-%Y")
        .to_string()
}
