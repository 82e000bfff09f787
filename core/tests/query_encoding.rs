//! Property checks for the query-string omission rule.

use pricewatch_core::{ClientConfig, HttpMethod, ParamValue, PriceClient, QueryParams};
use proptest::prelude::*;
use reqwest::Url;

fn value() -> impl Strategy<Value = ParamValue> {
    prop_oneof![
        Just(ParamValue::Absent),
        Just(ParamValue::Str(String::new())),
        "[a-zA-Z0-9 &=+%/?]{1,12}".prop_map(ParamValue::Str),
        any::<i64>().prop_map(ParamValue::Int),
        (-1.0e6f64..1.0e6).prop_map(ParamValue::Float),
        any::<bool>().prop_map(ParamValue::Bool),
    ]
}

proptest! {
    #[test]
    fn omitted_values_never_appear_and_others_appear_once(
        values in prop::collection::vec(value(), 0..12)
    ) {
        let client = PriceClient::new(ClientConfig::new("http://localhost:5000").unwrap());
        let params: QueryParams = values
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("p{i}"), v.clone()))
            .collect();

        let req = client
            .build_request(HttpMethod::Get, "/search", &params, None)
            .unwrap();
        let url = Url::parse(&req.url).unwrap();
        let decoded: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        let expected: Vec<(String, String)> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_omitted())
            .map(|(i, v)| (format!("p{i}"), v.to_string()))
            .collect();
        prop_assert_eq!(decoded, expected);

        if values.iter().all(ParamValue::is_omitted) {
            prop_assert!(req.query().is_none());
        }
    }
}
