//! 命名约定转换。
//!
//! # 逻辑解析（How）
//! - 按“单词边界”切分标识符：小写或数字后接大写、连续大写后接“大写+小写”（缩写结尾）；
//! - `-`、空白、`_` 以及其他非字母数字字符都视为分隔符，连续分隔符只保留一个；
//! - 结果首尾不留分隔符。
//!
//! 例：`HTTPServerPort` → `HTTP_SERVER_PORT`，`max-conns` → `MAX_CONNS`，`dbURL2` → `DB_URL2`。

/// 按单词边界拆分并以 `separator` 连接，字母按 `upper` 统一大小写。
fn convert(name: &str, separator: char, upper: bool) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    let mut last_separator = false;
    let mut wrote_any = false;
    let mut prev_lower_or_digit = false;
    let mut prev_upper = false;

    for (index, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            let next_lower = chars.get(index + 1).is_some_and(|next| next.is_lowercase());
            if prev_lower_or_digit || (prev_upper && next_lower) {
                push_separator(&mut out, separator, &mut last_separator, wrote_any);
            }
            push_cased(&mut out, ch, upper);
            (last_separator, wrote_any, prev_lower_or_digit, prev_upper) = (false, true, false, true);
        } else if ch.is_lowercase() || ch.is_numeric() {
            push_cased(&mut out, ch, upper);
            (last_separator, wrote_any, prev_lower_or_digit, prev_upper) = (false, true, true, false);
        } else {
            push_separator(&mut out, separator, &mut last_separator, wrote_any);
            (prev_lower_or_digit, prev_upper) = (false, false);
        }
    }

    if out.ends_with(separator) {
        out.pop();
    }
    out
}

fn push_separator(out: &mut String, separator: char, last_separator: &mut bool, wrote_any: bool) {
    if !*last_separator && wrote_any {
        out.push(separator);
        *last_separator = true;
    }
}

fn push_cased(out: &mut String, ch: char, upper: bool) {
    if upper {
        out.extend(ch.to_uppercase());
    } else {
        out.extend(ch.to_lowercase());
    }
}

/// 环境变量名：`UPPER_SNAKE`。
pub fn to_env_var(name: &str) -> String {
    convert(name, '_', true)
}

/// 大写蛇形。
pub fn to_upper_snake(name: &str) -> String {
    convert(name, '_', true)
}

/// 小写蛇形。
pub fn to_lower_snake(name: &str) -> String {
    convert(name, '_', false)
}

/// 把 `delimiter` 分隔的输入改写为逗号分隔，并去除每个片段的首尾空白。
///
/// 分隔符为空或输入中不含分隔符时原样返回。
pub fn normalize_delimited(input: &str, delimiter: &str) -> String {
    if delimiter.is_empty() || !input.contains(delimiter) {
        return input.to_owned();
    }
    input
        .split(delimiter)
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(",")
}

/// 字段声明的分隔符优先，否则使用来源级默认值。
pub fn resolve_delimiter<'a>(field: Option<&'a str>, default: &'a str) -> &'a str {
    match field {
        Some(delimiter) if !delimiter.is_empty() => delimiter,
        _ => default,
    }
}
