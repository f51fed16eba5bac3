pub use anstream::println as aprintln;

const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const CYAN: &str = "\x1b[36m";

/// Green text, used for additions and success lines.
pub fn p_g(text: &str) -> String {
    format!("{GREEN}{text}{RESET}")
}

/// Red text, used for deletions.
pub fn p_r(text: &str) -> String {
    format!("{RED}{text}{RESET}")
}

/// Yellow text, used for in-place changes and warnings.
pub fn p_y(text: &str) -> String {
    format!("{YELLOW}{text}{RESET}")
}

/// Blue text, used for labels.
pub fn p_b(text: &str) -> String {
    format!("{BLUE}{text}{RESET}")
}

/// Cyan text, used for section headers.
pub fn p_c(text: &str) -> String {
    format!("{CYAN}{text}{RESET}")
}
