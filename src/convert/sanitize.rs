//! Best-effort repair of parameter dumps that embed object inspections.
//!
//! Some producers write uploaded files and other objects as `#<Class @attr="...">`
//! inside an otherwise literal map. The rewrites below turn those fragments into
//! quoted strings so the literal parser can read the surrounding map. They are
//! applied in order; later rules undo over-eager quoting done by earlier ones.

const REWRITES: [(&str, &str); 9] = [
    // `#<Foo ...` opens a string
    ("#<", "\""),
    // `...>, "next"` closes it before the next key
    (">, \"", "\", \""),
    // `#< ... #<Bar>>}` nested object at the end of the map
    (">>}", "\\\"\"}"),
    // `#< ... #<Bar>>, "next"`
    (">>, \"", "\\\"\", \""),
    // `#< ... @content_type="image/jpeg", @headers=...`
    ("\", @", "\\\", @"),
    // `#< ... filename="IMG_2228.JPG" ...`
    ("=\"", "=\\\""),
    // values ending in `=` (base64 padding) followed by another key
    ("=\\\", \"", "=\", \""),
    // values ending in `=` at the end of the map
    ("=\\\"}", "=\"}"),
    // stray NUL escapes
    ("\\0", ""),
];

/// Applies the rewrite sequence to a raw parameter string
pub fn sanitize_parameters(raw: &str) -> String {
    REWRITES
        .iter()
        .fold(raw.to_string(), |text, (from, to)| text.replace(from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_literals_are_untouched() {
        let raw = r#"{"id"=>"203341", "page"=>"2"}"#;
        assert_eq!(sanitize_parameters(raw), raw);
    }

    #[test]
    fn base64_padding_is_restored() {
        assert_eq!(
            sanitize_parameters(r#"{"token"=>"hSMjag0w=", "id"=>"1"}"#),
            r#"{"token"=>"hSMjag0w=", "id"=>"1"}"#
        );
        assert_eq!(
            sanitize_parameters(r#"{"token"=>"hSMjag0w="}"#),
            r#"{"token"=>"hSMjag0w="}"#
        );
    }

    #[test]
    fn simple_object_marker_becomes_string() {
        assert_eq!(
            sanitize_parameters(r#"{"user"=>#<User id: 1>, "id"=>"7"}"#),
            r#"{"user"=>"User id: 1", "id"=>"7"}"#
        );
    }

    #[test]
    fn nested_upload_object_is_quoted() {
        let raw = r#"{"photo"=>#<UploadedFile @original_filename="IMG_2228.JPG", @tempfile=#<Tempfile:/tmp/upload.jpg>>}"#;
        assert_eq!(
            sanitize_parameters(raw),
            r#"{"photo"=>"UploadedFile @original_filename=\"IMG_2228.JPG\", @tempfile=\"Tempfile:/tmp/upload.jpg\""}"#
        );
    }
}
