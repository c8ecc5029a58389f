/// `MM:SS`, zero padded. Minutes are not wrapped into hours.
pub fn mm_ss(total_secs: u64) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
