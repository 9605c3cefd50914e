//! Shell escaping for command-line operands.
//!
//! | Shell | Convention |
//! |---|---|
//! | POSIX `sh` | always single-quoted; `'` becomes `'\''` |
//! | Windows `cmd` | always double-quoted for MSVCRT argv, then every `cmd` metacharacter caret-escaped; `%` kept literal |
//!
//! Every byte of the input survives: non-ASCII text is passed through as-is
//! inside the quotes rather than being stripped.
//!
//! On Windows two parsers read the same text. `cmd` strips one level of
//! carets first, so after caret escaping it sees no quotes and no operators:
//!
//! ```text
//! a&b "c".png  →  "a&b \"c\".png"  →  ^"a^&b \^"c\^".png^"
//!                 (MSVCRT argv)        (cmd)
//! ```
//!
//! Escaping runs inside the [locale gateway](super::locale) with the locale
//! from the [`EscapeContext`]. Both quoting rules work on characters and never
//! read `LC_CTYPE`; the switch only puts a configured `locale` in effect for
//! the duration of each escape call and is skipped when none is configured.

use super::locale::with_ctype_locale;
use std::borrow::Cow;

/// Stand-in for `%` while quoting for `cmd`; contains nothing any shell treats specially.
const PERCENT_PLACEHOLDER: &str = "1357902468MAGICKEXECPERCENTSIGN8642097531";

/// Characters `cmd` interprets outside double quotes.
const CMD_METACHARACTERS: &[char] = &['(', ')', '!', '^', '"', '<', '>', '&', '|'];

/// Which shell will parse the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellFlavor {
    Posix,
    Windows,
}

impl ShellFlavor {
    /// The flavor of the host this binary was compiled for.
    pub fn native() -> Self {
        if cfg!(windows) {
            ShellFlavor::Windows
        } else {
            ShellFlavor::Posix
        }
    }

    /// Executable file suffix for this platform family.
    pub fn executable_suffix(self) -> &'static str {
        match self {
            ShellFlavor::Posix => "",
            ShellFlavor::Windows => ".exe",
        }
    }
}

/// Everything an escape call depends on, passed explicitly instead of read from globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeContext {
    pub flavor: ShellFlavor,
    /// `LC_CTYPE` locale active while escaping; `None` keeps the current one.
    pub locale: Option<String>,
}

impl EscapeContext {
    pub fn new(flavor: ShellFlavor, locale: Option<String>) -> Self {
        Self { flavor, locale }
    }

    /// Native flavor, no locale switch.
    pub fn native() -> Self {
        Self::new(ShellFlavor::native(), None)
    }

    /// Escapes `raw` as a single shell word.
    ///
    /// Only a configured `locale` goes through the locale gateway; without one
    /// the word is quoted directly.
    pub fn escape(&self, raw: &str) -> String {
        match self.locale.as_deref() {
            None => self.quote(raw),
            Some(locale) => with_ctype_locale(Some(locale), || self.quote(raw)),
        }
    }

    fn quote(&self, raw: &str) -> String {
        match self.flavor {
            ShellFlavor::Posix => quote_posix(raw),
            ShellFlavor::Windows => quote_windows(raw),
        }
    }
}

impl Default for EscapeContext {
    fn default() -> Self {
        Self::native()
    }
}

fn quote_posix(raw: &str) -> String {
    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('\'');
    for ch in raw.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

fn quote_windows(raw: &str) -> String {
    let guarded = raw.replace('%', PERCENT_PLACEHOLDER);
    let argv = quote_argv(shell_escape::windows::escape(Cow::Owned(guarded)));
    caret_escape(&argv.replace(PERCENT_PLACEHOLDER, "%"))
}

/// Forces MSVCRT double quotes around a word `shell_escape` left bare.
///
/// A bare word has no quotes or whitespace, so only its trailing backslashes
/// need doubling to keep them from escaping the closing quote.
fn quote_argv(escaped: Cow<'_, str>) -> String {
    if escaped.starts_with('"') {
        return escaped.into_owned();
    }
    let trailing = escaped.len() - escaped.trim_end_matches('\\').len();
    format!("\"{escaped}{}\"", "\\".repeat(trailing))
}

fn caret_escape(word: &str) -> String {
    let mut out = String::with_capacity(word.len() * 2);
    for ch in word.chars() {
        if CMD_METACHARACTERS.contains(&ch) {
            out.push('^');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posix() -> EscapeContext {
        EscapeContext::new(ShellFlavor::Posix, None)
    }

    fn windows() -> EscapeContext {
        EscapeContext::new(ShellFlavor::Windows, None)
    }

    // =========================================================================
    // POSIX quoting
    // =========================================================================

    #[test]
    fn posix_plain_word_is_single_quoted() {
        assert_eq!(posix().escape("abc"), "'abc'");
    }

    #[test]
    fn posix_empty_string_is_an_empty_word() {
        assert_eq!(posix().escape(""), "''");
    }

    #[test]
    fn posix_single_quote_is_spliced() {
        assert_eq!(posix().escape("it's"), "'it'\\''s'");
    }

    #[test]
    fn posix_keeps_non_ascii() {
        assert_eq!(posix().escape("/tmp/Ölfäß 写真.png"), "'/tmp/Ölfäß 写真.png'");
    }

    #[test]
    fn posix_escapes_once_per_call() {
        let ctx = posix();
        assert_eq!(ctx.escape("abc"), ctx.escape("abc"));
    }

    #[test]
    fn locale_switch_does_not_change_result() {
        let with_locale = EscapeContext::new(ShellFlavor::Posix, Some("C".into()));
        assert_eq!(with_locale.escape("a b"), posix().escape("a b"));
    }

    #[test]
    fn escape_without_locale_skips_the_gateway() {
        let held = crate::exec::locale::hold_gate();
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(posix().escape("it's"));
        });
        let escaped = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("escape waited on the locale gate");
        drop(held);
        assert_eq!(escaped, r"'it'\''s'");
    }

    #[cfg(unix)]
    #[test]
    fn posix_round_trips_through_sh() {
        let inputs = [
            "plain",
            "with space",
            "quote ' and \" double",
            "$HOME `id` $(id) ; | & > < * ? [0] ~",
            "back\\slash\nnewline",
            "Grüße 日本語 🎉",
            "100%",
        ];
        let ctx = posix();
        for input in inputs {
            let script = format!("printf '%s' {}", ctx.escape(input));
            let out = std::process::Command::new("sh")
                .arg("-c")
                .arg(&script)
                .output()
                .unwrap();
            assert!(out.status.success(), "sh failed for {input:?}");
            assert_eq!(String::from_utf8(out.stdout).unwrap(), input);
        }
    }

    // =========================================================================
    // Windows quoting
    // =========================================================================

    /// What `cmd` followed by the MSVCRT argv parser make of one escaped word.
    fn cmd_then_argv(escaped: &str) -> Vec<String> {
        let mut line = String::new();
        let mut chars = escaped.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '^' => line.extend(chars.next()),
                '&' | '|' | '<' | '>' => panic!("bare cmd operator {ch:?} in {escaped:?}"),
                _ => line.push(ch),
            }
        }

        let mut args = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut started = false;
        let mut chars = line.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\\' => {
                    let mut slashes = 1;
                    while chars.peek() == Some(&'\\') {
                        chars.next();
                        slashes += 1;
                    }
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        current.push_str(&"\\".repeat(slashes / 2));
                        if slashes % 2 == 1 {
                            current.push('"');
                        } else {
                            in_quotes = !in_quotes;
                        }
                    } else {
                        current.push_str(&"\\".repeat(slashes));
                    }
                    started = true;
                }
                '"' => {
                    in_quotes = !in_quotes;
                    started = true;
                }
                ' ' | '\t' if !in_quotes => {
                    if started {
                        args.push(std::mem::take(&mut current));
                        started = false;
                    }
                }
                _ => {
                    current.push(ch);
                    started = true;
                }
            }
        }
        if started {
            args.push(current);
        }
        args
    }

    #[test]
    fn windows_always_quotes() {
        assert_eq!(windows().escape("abc"), "^\"abc^\"");
        assert_eq!(windows().escape(""), "^\"^\"");
        assert_eq!(
            windows().escape(r"C:\Program Files\ImageMagick"),
            r#"^"C:\Program Files\ImageMagick^""#
        );
    }

    #[test]
    fn windows_escapes_cmd_operators() {
        assert_eq!(windows().escape("a&b.png"), "^\"a^&b.png^\"");
        assert_eq!(windows().escape("x|y"), "^\"x^|y^\"");
        assert_eq!(windows().escape("a^b"), "^\"a^^b^\"");
        assert_eq!(windows().escape("a>b<c"), "^\"a^>b^<c^\"");
    }

    #[test]
    fn windows_embedded_quotes_and_trailing_backslashes() {
        assert_eq!(windows().escape(r#"say "hi""#), r#"^"say \^"hi\^"^""#);
        assert_eq!(windows().escape(r"C:\out\"), r#"^"C:\out\\^""#);
    }

    #[test]
    fn windows_keeps_percent_signs() {
        assert_eq!(windows().escape("100%"), "^\"100%^\"");
        assert_eq!(windows().escape("50% off"), "^\"50% off^\"");
    }

    #[test]
    fn windows_identify_format_stays_one_word() {
        let format = crate::imaging::IDENTIFY_FORMAT;
        let escaped = windows().escape(format);
        assert!(escaped.contains("^|width"));
        assert_eq!(cmd_then_argv(&escaped), vec![format.to_string()]);
    }

    #[test]
    fn windows_round_trips_through_cmd_and_argv() {
        let inputs = [
            "plain",
            "",
            "with space",
            "a&b.png",
            "x|y & del *.*",
            "a^b (c) !d! <in >out",
            r#"quote " inside"#,
            r#"C:\dir with space\"#,
            r#"back\\"quote"#,
            "100% and 5%",
            "Bild Ä 写真.png",
        ];
        for input in inputs {
            let escaped = windows().escape(input);
            assert_eq!(cmd_then_argv(&escaped), vec![input.to_string()], "{escaped}");
        }
    }

    #[test]
    fn executable_suffix_per_flavor() {
        assert_eq!(ShellFlavor::Posix.executable_suffix(), "");
        assert_eq!(ShellFlavor::Windows.executable_suffix(), ".exe");
    }
}
