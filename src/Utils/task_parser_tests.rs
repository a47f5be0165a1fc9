/////////////////////////////TESTS////////////////////////////////////////////////////
/*
tests:
pieces of the grammar (title, key, value, list, pair, section)
whole documents, comments, templates
malformed documents
*/

#[cfg(test)]
mod tests1 {
    use crate::Utils::task_parser::{
        Value, filter_comments, parse_document, parse_document_as, parse_key,
        parse_key_value_pair, parse_section, parse_title, parse_value, parse_value_list,
        single_value, template_of,
    };
    use crate::symbolic::errors::SettingsError;

    #[test]
    fn test_parse_title() {
        let (remaining, title) = parse_title("simplify\n max_passes: 30").unwrap();
        assert_eq!(title, "simplify");
        assert_eq!(remaining, "max_passes: 30");

        let (remaining, title) = parse_title("_compile2 names: x").unwrap();
        assert_eq!(title, "_compile2");
        assert_eq!(remaining, "names: x");

        assert!(parse_title("1simplify").is_err());
    }

    #[test]
    fn test_parse_key() {
        let (remaining, key) = parse_key("sort_level: shape").unwrap();
        assert_eq!(key, "sort_level");
        assert_eq!(remaining, ": shape");
    }

    #[test]
    fn test_parse_value() {
        let (remaining, value) = parse_value("shape, next").unwrap();
        assert_eq!(value, Value::String("shape".to_string()));
        assert_eq!(remaining, ", next");

        let (_, value) = parse_value("30").unwrap();
        assert_eq!(value, Value::Integer(30));

        let (_, value) = parse_value("1e-6;").unwrap();
        assert_eq!(value, Value::Float(1e-6));

        let (_, value) = parse_value("false").unwrap();
        assert_eq!(value, Value::Boolean(false));
    }

    #[test]
    fn test_parse_value_list() {
        let (remaining, values) = parse_value_list("x, y ,z").unwrap();
        assert_eq!(
            values,
            vec![
                Value::String("x".to_string()),
                Value::String("y".to_string()),
                Value::String("z".to_string())
            ]
        );
        assert_eq!(remaining, "");

        let (_, values) = parse_value_list("").unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn test_parse_key_value_pair() {
        let (remaining, (key, values)) = parse_key_value_pair("max_passes : 30 loglevel: off").unwrap();
        assert_eq!(key, "max_passes");
        assert_eq!(values, vec![Value::Integer(30)]);
        assert_eq!(remaining, "loglevel: off");

        let (remaining, (key, values)) = parse_key_value_pair("names: x, y;").unwrap();
        assert_eq!(key, "names");
        assert_eq!(values.len(), 2);
        assert_eq!(remaining, ";");
    }

    #[test]
    fn test_parse_section() {
        let (remaining, (title, map)) =
            parse_section("simplify max_passes: 30 sort_level: shape").unwrap();
        assert_eq!(title, "simplify");
        assert_eq!(map.len(), 2);
        assert_eq!(map["max_passes"], vec![Value::Integer(30)]);
        assert_eq!(map["sort_level"], vec![Value::String("shape".to_string())]);
        assert_eq!(remaining, "");
    }

    #[test]
    fn test_parse_document_with_several_sections() {
        let input = "simplify max_passes: 30 long_division: false\ncompile names: x, y";
        let (remaining, document) = parse_document(input).unwrap();
        assert_eq!(remaining, "");
        assert_eq!(document.len(), 2);
        assert_eq!(
            document["simplify"]["long_division"],
            Some(vec![Value::Boolean(false)])
        );
        assert_eq!(document["compile"]["names"].as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_filter_comments() {
        let input = "// settings\nsimplify\n# passes\n  max_passes: 5\n\n% done";
        assert_eq!(filter_comments(input), "simplify\n  max_passes: 5");
    }

    #[test]
    fn test_parse_document_as_with_template() {
        let template = template_of(&[("simplify", &["max_passes", "loglevel"][..])]);
        let document = parse_document_as(
            "// only one key\nsimplify\n    max_passes: 7\n",
            Some(&template),
        )
        .unwrap();
        let section = &document["simplify"];
        assert_eq!(section["max_passes"], Some(vec![Value::Integer(7)]));
        assert_eq!(section["loglevel"], None);
        assert_eq!(
            single_value(section, "max_passes").unwrap(),
            Some(&Value::Integer(7))
        );
        assert_eq!(single_value(section, "loglevel").unwrap(), None);
        assert_eq!(single_value(section, "missing").unwrap(), None);
    }

    #[test]
    fn test_single_value_rejects_lists() {
        let document = parse_document_as("simplify loglevel: info, warn", None).unwrap();
        assert_eq!(
            single_value(&document["simplify"], "loglevel"),
            Err(SettingsError::InvalidValue {
                key: "loglevel".to_string(),
                value: "info, warn".to_string()
            })
        );
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            parse_document_as("", None),
            Err(SettingsError::Parse(_))
        ));
        assert!(matches!(
            parse_document_as("# nothing but comments", None),
            Err(SettingsError::Parse(_))
        ));
        // a title without key-value pairs
        assert!(matches!(
            parse_document_as("simplify", None),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Integer(3).as_float(), Some(3.0));
        assert_eq!(Value::Float(0.5).as_integer(), None);
        assert_eq!(Value::Boolean(true).as_boolean(), Some(true));
        assert_eq!(
            Value::String("off".to_string()).as_string().map(String::as_str),
            Some("off")
        );
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
    }
}
