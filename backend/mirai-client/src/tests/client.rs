// Unit tests for response unwrapping in the call facade.

use crate::client::unwrap_response;
use crate::error::CallError;

use common::ApiStatusCode;

use serde_json::json;

/// **VALUE**: Verifies the status envelope is stripped and a nested `data`
/// field becomes the result.
///
/// **WHY THIS MATTERS**: Callers receive the operation result, not the
/// transport's code/msg wrapper; typed layers deserialize the returned value
/// directly.
///
/// **BUG THIS CATCHES**: The wrapper leaking through, which would break
/// every typed deserialization downstream.
#[test]
fn given_success_with_nested_data_when_unwrapped_then_inner_data_returned() {
    let payload = json!({
        "code": 0,
        "msg": "success",
        "data": [{ "id": 10, "name": "G", "permission": "MEMBER" }]
    });
    let result = unwrap_response(payload).unwrap();
    assert_eq!(result[0]["id"], 10);
}

/// **VALUE**: Verifies flat success payloads lose only `code` and `msg`.
///
/// **WHY THIS MATTERS**: Operations like message sending return their result
/// fields beside the status (`{code, msg, messageId}`); those fields must
/// survive.
///
/// **BUG THIS CATCHES**: Over-eager stripping that discards result fields.
#[test]
fn given_success_with_flat_fields_when_unwrapped_then_status_stripped_fields_kept() {
    let payload = json!({ "code": 0, "msg": "success", "messageId": 123456 });
    let result = unwrap_response(payload).unwrap();
    assert_eq!(result, json!({ "messageId": 123456 }));
}

/// **VALUE**: Verifies a nonzero status fails the call with the mapped
/// message.
///
/// **WHY THIS MATTERS**: Remote errors are a normal expected outcome;
/// collaborators branch on the carried code and show the mapped message.
///
/// **BUG THIS CATCHES**: The code being lost in translation, or a nonzero
/// status resolving successfully.
#[test]
fn given_nonzero_code_when_unwrapped_then_remote_error_with_mapped_message() {
    let payload = json!({ "code": 5, "msg": "target not found" });
    match unwrap_response(payload) {
        Err(CallError::Remote { code, message }) => {
            assert_eq!(code, ApiStatusCode(5));
            assert_eq!(message, "The target does not exist");
        }
        other => panic!("expected Remote error, got {other:?}"),
    }
}

/// **VALUE**: Verifies payloads without a status envelope pass through
/// untouched.
///
/// **WHY THIS MATTERS**: Some operations respond with the bare result object
/// or an array; inventing an envelope around them would corrupt the result.
///
/// **BUG THIS CATCHES**: Unconditional field removal on non-enveloped
/// payloads.
#[test]
fn given_payload_without_status_when_unwrapped_then_passed_through() {
    let plain = json!({ "nickname": "bot", "email": "" });
    assert_eq!(unwrap_response(plain.clone()).unwrap(), plain);

    let array = json!([1, 2, 3]);
    assert_eq!(unwrap_response(array.clone()).unwrap(), array);
}
