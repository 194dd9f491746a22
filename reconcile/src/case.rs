//! Case transforms used to derive generated file and property names.
//!
//! Legacy screen and tab names are Portuguese display strings ("Endereços de
//! Entrega"). The scaffolding generator derived its file names from them
//! after folding diacritics, so every transform here folds first.

use std::collections::BTreeMap;

/// Replaces accented Latin letters with their base letter.
///
/// # Examples
///
/// ```
/// use formsync_reconcile::case::fold_diacritics;
///
/// assert_eq!(fold_diacritics("Endereços Não Usados"), "Enderecos Nao Usados");
/// ```
pub fn fold_diacritics(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ý' | 'ÿ' => 'y',
        'Ý' => 'Y',
        other => other,
    }
}

/// Splits on non-alphanumeric characters only, keeping inner casing.
fn segments(text: &str) -> Vec<String> {
    fold_diacritics(text)
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits into words on separators, lower-to-upper transitions, acronym
/// ends and letter/digit transitions.
fn words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    for segment in segments(text) {
        let chars: Vec<char> = segment.chars().collect();
        let mut current = String::new();
        for (i, &c) in chars.iter().enumerate() {
            if let Some(&prev) = i.checked_sub(1).and_then(|p| chars.get(p)) {
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
                let boundary = (prev.is_ascii_lowercase() && c.is_ascii_uppercase())
                    || (prev.is_ascii_digit() && c.is_ascii_alphabetic())
                    || (prev.is_ascii_uppercase() && c.is_ascii_digit())
                    || (prev.is_ascii_uppercase() && c.is_ascii_uppercase() && next_is_lower);
                if boundary && !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            current.push(c);
        }
        if !current.is_empty() {
            words.push(current);
        }
    }
    words
}

/// `Endereços de Entrega` → `enderecos-de-entrega`, `ClienteId` → `cliente-id`.
///
/// # Examples
///
/// ```
/// use formsync_reconcile::case::kebab_case;
///
/// assert_eq!(kebab_case("Dados Gerais"), "dados-gerais");
/// assert_eq!(kebab_case("LancamentoEntradaCaixas"), "lancamento-entrada-caixas");
/// assert_eq!(kebab_case("CPFCliente"), "cpf-cliente");
/// ```
pub fn kebab_case(text: &str) -> String {
    words(text)
        .iter()
        .map(|word| word.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// `dados gerais` → `DadosGerais`; inner casing of each segment is kept.
///
/// # Examples
///
/// ```
/// use formsync_reconcile::case::pascal_case;
///
/// assert_eq!(pascal_case("razão social"), "RazaoSocial");
/// assert_eq!(pascal_case("clienteId"), "ClienteId");
/// ```
pub fn pascal_case(text: &str) -> String {
    segments(text)
        .iter()
        .map(|segment| capitalize(segment))
        .collect()
}

/// `RazaoSocial` → `razaoSocial`, `Dados Gerais` → `dadosGerais`.
pub fn camel_case(text: &str) -> String {
    let pascal = pascal_case(text);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Lowercase with every separator removed: `Contas a Receber` → `contasareceber`.
pub fn compact_lower(text: &str) -> String {
    segments(text).concat().to_ascii_lowercase()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Singular form of a generated name.
///
/// An explicit override (keyed by the lowercase plural) wins; otherwise one
/// trailing `s` is stripped. The suffix rule is knowingly lossy for
/// irregular Portuguese plurals (`-ões`, `-ais`, `-res`), which is what the
/// override table is for.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use formsync_reconcile::case::singularize;
///
/// let mut overrides = BTreeMap::new();
/// overrides.insert("fornecedores".to_string(), "fornecedor".to_string());
///
/// assert_eq!(singularize("contas", &overrides), "conta");
/// assert_eq!(singularize("fornecedores", &overrides), "fornecedor");
/// assert_eq!(singularize("pessoa", &overrides), "pessoa");
/// ```
pub fn singularize(name: &str, overrides: &BTreeMap<String, String>) -> String {
    if let Some(singular) = overrides.get(&name.to_ascii_lowercase()) {
        let capitalized = name.chars().next().is_some_and(|c| c.is_ascii_uppercase());
        return if capitalized {
            capitalize(singular)
        } else {
            singular.clone()
        };
    }
    match name.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}
