//! Target language strategies
//!
//! Each language decides how identifiers are cased and how a [`BoundType`] is
//! spelled in generated source.

use convert_case::{Boundary, Case, Converter};

use super::types::BoundType;
use abibind_core::Lang;

/// Naming and type-spelling rules of a generated language
pub trait Language: Send + Sync {
    /// Language selector this strategy implements
    fn lang(&self) -> Lang;

    /// Spell a bound type in the target language
    fn bind_type(&self, ty: &BoundType) -> String;

    /// Spell the type of an indexed event parameter
    fn bind_topic_type(&self, ty: &BoundType) -> String {
        self.bind_type(ty)
    }

    fn normalize_method_name(&self, raw: &str) -> String;

    fn normalize_type_name(&self, raw: &str) -> String;

    fn normalize_field_name(&self, raw: &str) -> String;

    fn normalize_arg_name(&self, raw: &str) -> String;

    fn is_keyword(&self, ident: &str) -> bool;

    /// Method name already taken by a fixed member of the generated binding
    fn is_reserved_member(&self, _ident: &str) -> bool {
        false
    }

    /// Name of the handlebars template rendering this language
    fn template_name(&self) -> &'static str;
}

/// Rust bindings on top of `ethers`
#[derive(Debug, Default, Clone, Copy)]
pub struct RustLang;

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try",
];

/// Associated fns every generated Rust contract defines
const RUST_RESERVED_MEMBERS: &[&str] = &["new", "address", "deploy"];

impl Language for RustLang {
    fn lang(&self) -> Lang {
        Lang::Rust
    }

    fn bind_type(&self, ty: &BoundType) -> String {
        match ty {
            BoundType::Address => "Address".to_string(),
            BoundType::Bool => "bool".to_string(),
            BoundType::String => "String".to_string(),
            BoundType::Bytes => "Bytes".to_string(),
            BoundType::Hash => "H256".to_string(),
            BoundType::FixedBytes(size) => format!("[u8; {}]", size),
            BoundType::Int { signed, bits } => {
                format!("{}{}", if *signed { "i" } else { "u" }, bits)
            }
            BoundType::BigInt { signed: true, .. } => "I256".to_string(),
            BoundType::BigInt { signed: false, .. } => "U256".to_string(),
            BoundType::Array(inner, size) => format!("[{}; {}]", self.bind_type(inner), size),
            BoundType::Slice(inner) => format!("Vec<{}>", self.bind_type(inner)),
            BoundType::Struct { name, .. } => name.clone(),
        }
    }

    fn normalize_method_name(&self, raw: &str) -> String {
        rust_case(raw, Case::Snake)
    }

    fn normalize_type_name(&self, raw: &str) -> String {
        rust_case(raw, Case::Pascal)
    }

    fn normalize_field_name(&self, raw: &str) -> String {
        rust_case(raw, Case::Snake)
    }

    fn normalize_arg_name(&self, raw: &str) -> String {
        rust_case(raw, Case::Snake)
    }

    fn is_keyword(&self, ident: &str) -> bool {
        RUST_KEYWORDS.contains(&ident)
    }

    fn is_reserved_member(&self, ident: &str) -> bool {
        RUST_RESERVED_MEMBERS.contains(&ident)
    }

    fn template_name(&self) -> &'static str {
        "rust"
    }
}

/// Digits stay attached to their word so `arg0` and `foo1` survive casing
fn rust_case(raw: &str, case: Case) -> String {
    Converter::new()
        .to_case(case)
        .remove_boundaries(&Boundary::digits())
        .convert(raw)
}

/// Go bindings on top of go-ethereum's `bind` package
#[derive(Debug, Default, Clone, Copy)]
pub struct GoLang;

const GO_KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
    "return", "select", "struct", "switch", "type", "var",
];

impl Language for GoLang {
    fn lang(&self) -> Lang {
        Lang::Go
    }

    fn bind_type(&self, ty: &BoundType) -> String {
        match ty {
            BoundType::Address => "common.Address".to_string(),
            BoundType::Bool => "bool".to_string(),
            BoundType::String => "string".to_string(),
            BoundType::Bytes => "[]byte".to_string(),
            BoundType::Hash => "common.Hash".to_string(),
            BoundType::FixedBytes(size) => format!("[{}]byte", size),
            BoundType::Int { signed, bits } => {
                format!("{}int{}", if *signed { "" } else { "u" }, bits)
            }
            BoundType::BigInt { .. } => "*big.Int".to_string(),
            BoundType::Array(inner, size) => format!("[{}]{}", size, self.bind_type(inner)),
            BoundType::Slice(inner) => format!("[]{}", self.bind_type(inner)),
            BoundType::Struct { name, .. } => name.clone(),
        }
    }

    fn normalize_method_name(&self, raw: &str) -> String {
        go_camel_case(raw)
    }

    fn normalize_type_name(&self, raw: &str) -> String {
        go_camel_case(raw)
    }

    fn normalize_field_name(&self, raw: &str) -> String {
        go_camel_case(raw)
    }

    fn normalize_arg_name(&self, raw: &str) -> String {
        raw.to_string()
    }

    fn is_keyword(&self, ident: &str) -> bool {
        GO_KEYWORDS.contains(&ident)
    }

    // `Pack` + name would collide with `PackConstructor`
    fn is_reserved_member(&self, ident: &str) -> bool {
        ident == "Constructor"
    }

    fn template_name(&self) -> &'static str {
        "go"
    }
}

/// Exported Go identifier: `_`-separated parts each get an upper-case first letter
fn go_camel_case(raw: &str) -> String {
    raw.split('_').map(capitalise).collect()
}

fn capitalise(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

static RUST: RustLang = RustLang;
static GO: GoLang = GoLang;

/// Strategy implementing `lang`
pub fn strategy(lang: Lang) -> &'static dyn Language {
    match lang {
        Lang::Rust => &RUST,
        Lang::Go => &GO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_selection() {
        assert_eq!(strategy(Lang::Rust).lang(), Lang::Rust);
        assert_eq!(strategy(Lang::Go).lang(), Lang::Go);
        assert_eq!(strategy(Lang::Go).template_name(), "go");
    }

    #[test]
    fn test_rust_naming() {
        let rust = RustLang;
        assert_eq!(rust.normalize_method_name("MPools"), "m_pools");
        assert_eq!(rust.normalize_method_name("balanceOf"), "balance_of");
        assert_eq!(rust.normalize_field_name("AppAddr"), "app_addr");
        assert_eq!(rust.normalize_type_name("token_info"), "TokenInfo");
        assert_eq!(rust.normalize_arg_name("arg0"), "arg0");
        assert_eq!(rust.normalize_method_name("transfer1"), "transfer1");
        assert!(rust.is_keyword("type"));
        assert!(!rust.is_keyword("owner"));
    }

    #[test]
    fn test_digits_kept_with_words() {
        let rust = RustLang;
        assert_eq!(rust.normalize_method_name("getReserve0"), "get_reserve0");
        assert_eq!(rust.normalize_type_name("erc20_info"), "Erc20Info");
        assert_eq!(rust.normalize_field_name("reserve0"), "reserve0");
    }

    #[test]
    fn test_reserved_members() {
        assert!(RustLang.is_reserved_member("address"));
        assert!(RustLang.is_reserved_member("new"));
        assert!(RustLang.is_reserved_member("deploy"));
        assert!(!RustLang.is_reserved_member("owner"));
        assert!(GoLang.is_reserved_member("Constructor"));
        assert!(!GoLang.is_reserved_member("Deploy"));
    }

    #[test]
    fn test_go_naming() {
        let go = GoLang;
        assert_eq!(go.normalize_method_name("balanceOf"), "BalanceOf");
        assert_eq!(go.normalize_method_name("_under_score"), "UnderScore");
        assert_eq!(go.normalize_field_name("status"), "Status");
        assert_eq!(go.normalize_arg_name("_to"), "_to");
        assert!(go.is_keyword("range"));
    }

    #[test]
    fn test_bind_types() {
        let nested = BoundType::Slice(Box::new(BoundType::Array(
            Box::new(BoundType::BigInt { signed: false, bits: 24 }),
            3,
        )));
        assert_eq!(RustLang.bind_type(&nested), "Vec<[U256; 3]>");
        assert_eq!(GoLang.bind_type(&nested), "[][3]*big.Int");

        assert_eq!(RustLang.bind_type(&BoundType::FixedBytes(4)), "[u8; 4]");
        assert_eq!(GoLang.bind_type(&BoundType::FixedBytes(4)), "[4]byte");
        assert_eq!(RustLang.bind_topic_type(&BoundType::Hash), "H256");
        assert_eq!(GoLang.bind_topic_type(&BoundType::Hash), "common.Hash");
        assert_eq!(GoLang.bind_type(&BoundType::Int { signed: true, bits: 16 }), "int16");
    }
}
