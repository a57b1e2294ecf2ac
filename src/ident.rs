//! Utility functions for deriving Scala identifiers from proto names.

use std::collections::HashSet;

use heck::{ToLowerCamelCase, ToShoutySnakeCase, ToUpperCamelCase};
use once_cell::sync::Lazy;

static SCALA_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "abstract", "case", "catch", "class", "def", "do", "else", "extends", "false", "final",
        "finally", "for", "forSome", "if", "implicit", "import", "lazy", "macro", "match", "new",
        "null", "object", "override", "package", "private", "protected", "return", "sealed",
        "super", "this", "throw", "trait", "try", "true", "type", "val", "var", "while", "with",
        "yield",
    ]
    .into_iter()
    .collect()
});

/// Members every generated message or companion already defines. A field
/// whose derived accessor name would collide gets a trailing underscore.
static RESERVED_MEMBERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "serializedSize",
        "writeTo",
        "companion",
        "getField",
        "getFieldByNumber",
        "toProtoString",
        "toString",
        "toByteArray",
        "hashCode",
        "equals",
        "clone",
        "copy",
        "finalize",
        "getClass",
        "notify",
        "notifyAll",
        "wait",
        "productArity",
        "productPrefix",
        "productElement",
        "productIterator",
        "canEqual",
    ]
    .into_iter()
    .collect()
});

/// Converts a `snake_case` proto name to a `lowerCamel` Scala identifier.
pub fn to_lower_camel(s: &str) -> String {
    s.to_lower_camel_case()
}

/// Converts a proto name to an `UpperCamel` Scala type identifier.
pub fn to_upper_camel(s: &str) -> String {
    s.to_upper_camel_case()
}

/// Back-tick quotes an identifier when it is a Scala keyword.
pub fn escape(ident: &str) -> String {
    if SCALA_KEYWORDS.contains(ident) {
        format!("`{}`", ident)
    } else {
        ident.to_string()
    }
}

/// The derived value/accessor name for a field: camel-cased, back-tick
/// quoted for keywords, and marked with a trailing underscore when it would
/// shadow a member of the generated message.
pub fn field_name(proto_name: &str) -> String {
    let ident = to_lower_camel(proto_name);
    if RESERVED_MEMBERS.contains(ident.as_str()) {
        format!("{}_", ident)
    } else {
        escape(&ident)
    }
}

/// The derived name without any back-tick quoting, for splicing into
/// compound member names such as the per-field size cache.
pub fn member_base_name(proto_name: &str) -> String {
    to_lower_camel(proto_name)
}

/// `SCREAMING_SNAKE` form used for the per-field number constants.
pub fn to_shouty_snake(proto_name: &str) -> String {
    proto_name.to_shouty_snake_case()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_lower_camel() {
        assert_eq!("fooBar", &to_lower_camel("foo_bar"));
        assert_eq!("fooBarBaz", &to_lower_camel("foo_bar_baz"));
        assert_eq!("foo2Bar", &to_lower_camel("foo2_bar"));
        assert_eq!("fooBar", &to_lower_camel("FooBar"));
        assert_eq!("fieldName7", &to_lower_camel("fieldName7"));
    }

    #[test]
    fn test_to_upper_camel() {
        assert_eq!("", &to_upper_camel(""));
        assert_eq!("F", &to_upper_camel("f"));
        assert_eq!("Foo", &to_upper_camel("FOO"));
        assert_eq!("FooBar", &to_upper_camel("FOO_BAR"));
        assert_eq!("FuzzBuster", &to_upper_camel("fuzzBuster"));
    }

    #[test]
    fn test_field_name_escapes_keywords() {
        assert_eq!("`type`", &field_name("type"));
        assert_eq!("`val`", &field_name("val"));
        assert_eq!("`lazy`", &field_name("lazy"));
        assert_eq!("regular", &field_name("regular"));
    }

    #[test]
    fn test_field_name_marks_reserved_members() {
        assert_eq!("serializedSize_", &field_name("serialized_size"));
        assert_eq!("companion_", &field_name("companion"));
        assert_eq!("toString_", &field_name("to_string"));
        assert_eq!("className", &field_name("class_name"));
    }
}
