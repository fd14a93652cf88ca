//! `M_NUL OPT <tokens>` option tokens exchanged during the handshake.

/// One token out of an `OPT` line. `Other` preserves tokens this
/// implementation doesn't act on, so they still round-trip if echoed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptToken {
    Nr,
    Nd,
    Crypt,
    CramMd5Challenge(String),
    Plz,
    Other(String),
}

impl OptToken {
    fn parse(token: &str) -> Self {
        if token == "NR" {
            OptToken::Nr
        } else if token == "ND" {
            OptToken::Nd
        } else if token == "CRYPT" {
            OptToken::Crypt
        } else if token == "PLZ" {
            OptToken::Plz
        } else if let Some(challenge) = token.strip_prefix("CRAM-MD5-") {
            OptToken::CramMd5Challenge(challenge.to_string())
        } else {
            OptToken::Other(token.to_string())
        }
    }

    fn render(&self) -> String {
        match self {
            OptToken::Nr => "NR".to_string(),
            OptToken::Nd => "ND".to_string(),
            OptToken::Crypt => "CRYPT".to_string(),
            OptToken::Plz => "PLZ".to_string(),
            OptToken::CramMd5Challenge(c) => format!("CRAM-MD5-{c}"),
            OptToken::Other(s) => s.clone(),
        }
    }
}

/// Parses the argument of an `M_NUL OPT <tokens>` line, i.e. everything
/// after the literal `OPT ` prefix. Returns `None` if `arg` isn't an
/// `OPT` line at all (it's then some other `M_NUL` info field).
pub fn parse_opt_line(arg: &str) -> Option<Vec<OptToken>> {
    let tokens = arg.strip_prefix("OPT")?;
    Some(tokens.split_whitespace().map(OptToken::parse).collect())
}

/// Renders a list of tokens back into an `OPT <tokens>` argument string.
pub fn render_opt_line(tokens: &[OptToken]) -> String {
    let mut out = String::from("OPT");
    for token in tokens {
        out.push(' ');
        out.push_str(&token.render());
    }
    out
}
