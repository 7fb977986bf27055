use std::fmt;
use std::str::FromStr;

/// Languages accepted by `/ask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    En,
    Bn,
    Hi,
    Ar,
    Es,
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported language code '{0}'; expected one of: en, bn, hi, ar, es")]
pub struct UnsupportedLang(pub String);

/// Google News edition parameters for a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewsLocale {
    pub hl: &'static str,
    pub gl: &'static str,
    pub ceid: &'static str,
}

impl Lang {
    pub const ALL: [Lang; 5] = [Lang::En, Lang::Bn, Lang::Hi, Lang::Ar, Lang::Es];

    pub fn code(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Bn => "bn",
            Lang::Hi => "hi",
            Lang::Ar => "ar",
            Lang::Es => "es",
        }
    }

    pub fn news_locale(self) -> NewsLocale {
        let (hl, gl, ceid) = match self {
            Lang::En => ("en-US", "US", "US:en"),
            Lang::Bn => ("bn", "BD", "BD:bn"),
            Lang::Hi => ("hi", "IN", "IN:hi"),
            Lang::Ar => ("ar", "EG", "EG:ar"),
            Lang::Es => ("es", "ES", "ES:es"),
        };
        NewsLocale { hl, gl, ceid }
    }

    /// DuckDuckGo `kl` region. Bengali has no dedicated region, so it searches worldwide.
    pub fn search_region(self) -> &'static str {
        match self {
            Lang::En => "us-en",
            Lang::Bn => "wt-wt",
            Lang::Hi => "in-en",
            Lang::Ar => "xa-ar",
            Lang::Es => "es-es",
        }
    }
}

impl FromStr for Lang {
    type Err = UnsupportedLang;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Lang::ALL
            .into_iter()
            .find(|lang| lang.code() == code)
            .ok_or_else(|| UnsupportedLang(s.to_string()))
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_codes() {
        for lang in Lang::ALL {
            assert_eq!(lang.code().parse::<Lang>().unwrap(), lang);
        }
    }

    #[test]
    fn parsing_ignores_case_and_whitespace() {
        assert_eq!(" EN ".parse::<Lang>().unwrap(), Lang::En);
        assert_eq!("Bn".parse::<Lang>().unwrap(), Lang::Bn);
    }

    #[test]
    fn rejects_unknown_code() {
        let err = "xx".parse::<Lang>().unwrap_err();
        assert!(err.to_string().contains("'xx'"), "got: {err}");
        assert!("".parse::<Lang>().is_err());
    }

    #[test]
    fn english_news_locale() {
        let locale = Lang::En.news_locale();
        assert_eq!(locale.hl, "en-US");
        assert_eq!(locale.ceid, "US:en");
    }

    #[test]
    fn display_matches_code() {
        assert_eq!(Lang::Ar.to_string(), "ar");
    }
}
