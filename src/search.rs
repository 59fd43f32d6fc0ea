pub const SEARCH_BOX_ID: &str = "searchBox";
pub const TABLE_ID: &str = "ticketTable";
/// Marks the data cells whose text is searched. Action cells (status and
/// assignee selects) are left out so their option labels never match.
pub const SEARCH_CELL_CLASS: &str = "searchable";

/// Visibility of each row for `query`: a row stays visible when its text
/// contains the query, ignoring case. An empty query shows everything.
pub fn filter_rows<S: AsRef<str>>(query: &str, rows: &[S]) -> Vec<bool> {
    let query = query.to_lowercase();
    rows.iter()
        .map(|row| row.as_ref().to_lowercase().contains(&query))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: [&str; 3] = ["Printer issue", "VPN down", "Disk full"];

    #[test]
    fn query_matches_case_insensitively() {
        assert_eq!(filter_rows("vpn", &ROWS), [false, true, false]);
        assert_eq!(filter_rows("VPN", &ROWS), [false, true, false]);
    }

    #[test]
    fn clearing_the_query_shows_all_rows() {
        assert_eq!(filter_rows("", &ROWS), [true, true, true]);
    }

    #[test]
    fn matches_anywhere_in_the_row_text() {
        let rows = ["12 Printer issue Open alice", "13 VPN down Closed bob"];
        assert_eq!(filter_rows("bob", &rows), [false, true]);
        assert_eq!(filter_rows("n ", &rows), [true, true]);
        assert_eq!(filter_rows("zzz", &rows), [false, false]);
    }
}
