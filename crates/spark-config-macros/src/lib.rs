//! spark-config 过程宏入口。
//!
//! # 设计意图（Why）
//! - 填充引擎需要一张“字段描述表”来代替运行时读取结构体标签，手写描述表既繁琐又容易与字段顺序脱节；
//! - `#[derive(Record)]` 在编译期生成描述表与按下标访问字段的实现，保证二者始终一致。
//!
//! # 集成方式（How）
//! - 在记录类型上派生 `Record`，并通过 `#[config(...)]` 声明字段元数据：
//!   `key = "..."`、`default = "..."`、`delim = "..."`、`segment = "..."`、`short = "..."`、`skip`；
//! - 生成代码以 `::spark_config_core` 为路径，业务 crate 需直接依赖 `spark-config-core`；
//! - 记录类型需要实现 `Default`，以便作为可选子记录时按需分配。

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, quote};
use syn::{
    Data, DeriveInput, Error, Fields, LitStr, Visibility, parse_macro_input, spanned::Spanned,
};

/// 为具名字段结构体生成 `Record` 与 `Field` 实现。
///
/// # 语义说明（What）
/// - **输入**：仅接受具名字段的结构体；
/// - **字段范围**：只有 `pub`（含 `pub(crate)` 等受限可见性）字段进入描述表，私有字段永远不被访问；
/// - **skip**：标记 `skip` 的字段保留在描述表中，但不可写、不参与判零；
/// - **输出**：`Record::schema` 返回静态描述表，`Record::field_mut` 按描述表下标返回字段视图。
#[proc_macro_derive(Record, attributes(config))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_record(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

#[derive(Default)]
struct FieldConfig {
    key: Option<LitStr>,
    default: Option<LitStr>,
    delimiter: Option<LitStr>,
    segment: Option<LitStr>,
    short: Option<LitStr>,
    skip: bool,
}

impl FieldConfig {
    fn parse(field: &syn::Field) -> Result<Self, Error> {
        let mut config = FieldConfig::default();
        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("config")) {
            attr.parse_nested_meta(|meta| {
                let slot = if meta.path.is_ident("key") {
                    &mut config.key
                } else if meta.path.is_ident("default") {
                    &mut config.default
                } else if meta.path.is_ident("delim") {
                    &mut config.delimiter
                } else if meta.path.is_ident("segment") {
                    &mut config.segment
                } else if meta.path.is_ident("short") {
                    &mut config.short
                } else if meta.path.is_ident("skip") {
                    config.skip = true;
                    return Ok(());
                } else {
                    return Err(meta.error(
                        "不支持的 config 属性，可选：key、default、delim、segment、short、skip",
                    ));
                };
                if slot.is_some() {
                    return Err(meta.error("config 属性重复声明"));
                }
                *slot = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            })?;
        }
        Ok(config)
    }

    fn to_attrs(&self) -> TokenStream2 {
        let mut attrs = quote!(::spark_config_core::FieldAttrs::EMPTY);
        let builders = [
            ("key", &self.key),
            ("default_value", &self.default),
            ("delimiter", &self.delimiter),
            ("segment", &self.segment),
            ("short", &self.short),
        ];
        for (method, value) in builders {
            if let Some(value) = value {
                let method = syn::Ident::new(method, value.span());
                attrs = quote!(#attrs.#method(#value));
            }
        }
        if self.skip {
            attrs = quote!(#attrs.skip());
        }
        attrs
    }
}

fn expand_record(input: DeriveInput) -> Result<TokenStream2, Error> {
    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named,
            _ => {
                return Err(Error::new(
                    input.ident.span(),
                    "#[derive(Record)] 仅支持具名字段的结构体",
                ));
            }
        },
        _ => {
            return Err(Error::new(
                input.ident.span(),
                "#[derive(Record)] 仅支持结构体",
            ));
        }
    };

    let ident = &input.ident;
    let record_name = ident.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut descriptors = Vec::new();
    let mut accessors = Vec::new();
    let mut zero_checks = Vec::new();
    let mut index = 0_usize;
    for field in &named.named {
        if matches!(field.vis, Visibility::Inherited) {
            continue;
        }
        let Some(field_ident) = &field.ident else {
            return Err(Error::new(field.span(), "#[derive(Record)] 需要具名字段"));
        };
        let config = FieldConfig::parse(field)?;
        let name = field_ident.to_string();
        let type_name = render_type(&field.ty);
        let attrs = config.to_attrs();
        descriptors.push(quote! {
            ::spark_config_core::FieldDescriptor::new(#name, #type_name, #attrs)
        });
        if !config.skip {
            accessors.push(quote! {
                #index => ::core::option::Option::Some(
                    ::spark_config_core::Field::as_field(&mut self.#field_ident),
                ),
            });
            zero_checks.push(quote! {
                && ::spark_config_core::Field::field_is_zero(&self.#field_ident)
            });
        }
        index += 1;
    }

    Ok(quote! {
        impl #impl_generics ::spark_config_core::Record for #ident #ty_generics #where_clause {
            fn schema(&self) -> &'static ::spark_config_core::RecordSchema {
                static SCHEMA: ::spark_config_core::RecordSchema = ::spark_config_core::RecordSchema::new(
                    #record_name,
                    &[#(#descriptors),*],
                );
                &SCHEMA
            }

            fn field_mut(
                &mut self,
                index: usize,
            ) -> ::core::option::Option<::spark_config_core::FieldMut<'_>> {
                match index {
                    #(#accessors)*
                    _ => ::core::option::Option::None,
                }
            }

            fn is_zero(&self) -> bool {
                true #(#zero_checks)*
            }
        }

        impl #impl_generics ::spark_config_core::Field for #ident #ty_generics #where_clause {
            fn as_field(&mut self) -> ::spark_config_core::FieldMut<'_> {
                ::spark_config_core::FieldMut::Record(self)
            }

            fn optional_as_field(
                slot: &mut ::core::option::Option<Self>,
            ) -> ::spark_config_core::FieldMut<'_> {
                ::spark_config_core::FieldMut::OptionalRecord(slot)
            }

            fn field_is_zero(&self) -> bool {
                ::spark_config_core::Record::is_zero(self)
            }
        }
    })
}

/// 把类型渲染为紧凑文本，仅用于诊断信息。
fn render_type(ty: &syn::Type) -> String {
    let raw = ty.to_token_stream().to_string();
    let mut rendered = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == ' ' {
            let next = chars.peek().copied();
            let previous = rendered.chars().last();
            let tight = matches!(next, Some('<' | '>' | ',' | ':' | ';' | ']'))
                || matches!(previous, Some('<' | '&' | ':' | '['));
            if tight {
                continue;
            }
        }
        rendered.push(ch);
    }
    rendered
}
