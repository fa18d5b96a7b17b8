//! Deep-link parsing and routing. Links arrive from the OS open-url
//! callback, from a second instance's argv, and from the initial argv at
//! first-ready. Parsing never panics past this boundary; anything
//! unrecognized is dropped with a log entry or forwarded as `Unknown`.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tauri::{AppHandle, Manager};
use url::Url;

use crate::{
    bridge_events, CAPTCHA_SCHEME, DEEP_LINK_HTTPS_HOST, DEEP_LINK_SCHEME, MAIN_WINDOW_LABEL,
};

/// The closed command set. Adding a variant without handling it everywhere
/// is a compile error, which is the point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeepLinkAction {
    AddStickerPack {
        pack_id: String,
        pack_key_base64: String,
    },
    JoinGroup {
        invite_code: String,
    },
    ShowConversation {
        token: String,
    },
    Captcha {
        token: String,
    },
    Unknown {
        raw: String,
    },
}

/// Picks the first deep-linkable argument out of a process argv.
pub(crate) fn deep_link_from_argv(args: &[String]) -> Option<String> {
    let custom_prefix = format!("{DEEP_LINK_SCHEME}://");
    let captcha_prefix = format!("{CAPTCHA_SCHEME}://");
    let https_prefix = format!("https://{DEEP_LINK_HTTPS_HOST}/");
    args.iter()
        .find(|arg| {
            arg.starts_with(&custom_prefix)
                || arg.starts_with(&captcha_prefix)
                || arg.starts_with(&https_prefix)
        })
        .cloned()
}

pub(crate) fn parse_deep_link(raw: &str) -> Option<DeepLinkAction> {
    let parsed = match Url::parse(raw.trim()) {
        Ok(parsed) => parsed,
        Err(error) => {
            log::info!("dropping malformed deep link: {error}");
            return None;
        }
    };

    match parsed.scheme() {
        scheme if scheme == CAPTCHA_SCHEME => {
            // The whole remainder is the challenge token.
            let token = raw
                .trim()
                .strip_prefix(&format!("{CAPTCHA_SCHEME}://"))
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string();
            if token.is_empty() {
                log::info!("dropping captcha link without a token");
                return None;
            }
            Some(DeepLinkAction::Captcha { token })
        }
        scheme if scheme == DEEP_LINK_SCHEME => {
            let command = parsed.host_str().unwrap_or_default().to_string();
            Some(action_for_command(&command, &parsed, raw))
        }
        "https" => {
            if parsed.host_str() != Some(DEEP_LINK_HTTPS_HOST) {
                log::info!("dropping https link for unrecognized host");
                return None;
            }
            let command = parsed
                .path_segments()
                .and_then(|mut segments| segments.next())
                .unwrap_or_default()
                .to_string();
            Some(action_for_command(&command, &parsed, raw))
        }
        other => {
            log::info!("dropping deep link with unsupported scheme '{other}'");
            None
        }
    }
}

fn action_for_command(command: &str, parsed: &Url, raw: &str) -> DeepLinkAction {
    match command {
        "addstickers" => {
            let args = link_args(parsed);
            match (args.get("pack_id"), args.get("pack_key")) {
                (Some(pack_id), Some(pack_key_hex)) if !pack_id.is_empty() => {
                    match reencode_pack_key(pack_key_hex) {
                        Some(pack_key_base64) => DeepLinkAction::AddStickerPack {
                            pack_id: pack_id.clone(),
                            pack_key_base64,
                        },
                        None => unknown(raw),
                    }
                }
                _ => unknown(raw),
            }
        }
        "join" => {
            let invite_code = parsed.fragment().unwrap_or_default().to_string();
            if invite_code.is_empty() {
                unknown(raw)
            } else {
                DeepLinkAction::JoinGroup { invite_code }
            }
        }
        "show-conversation" => match link_args(parsed).get("token") {
            Some(token) if !token.is_empty() => DeepLinkAction::ShowConversation {
                token: token.clone(),
            },
            _ => unknown(raw),
        },
        _ => unknown(raw),
    }
}

fn unknown(raw: &str) -> DeepLinkAction {
    DeepLinkAction::Unknown {
        raw: raw.to_string(),
    }
}

/// Arguments may ride in the query (custom scheme) or in the fragment
/// (https form, so they never reach the server).
fn link_args(parsed: &Url) -> HashMap<String, String> {
    let mut args: HashMap<String, String> = parsed
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if let Some(fragment) = parsed.fragment() {
        for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
            args.entry(key.into_owned()).or_insert(value.into_owned());
        }
    }
    args
}

/// Sticker pack keys travel hex-encoded in links but the renderer protocol
/// carries them as standard base64.
fn reencode_pack_key(pack_key_hex: &str) -> Option<String> {
    let bytes = hex::decode(pack_key_hex).ok()?;
    if bytes.is_empty() {
        return None;
    }
    Some(BASE64.encode(bytes))
}

/// Dispatches one raw link. Safe to call with arbitrary input.
pub(crate) fn route(app_handle: &AppHandle, raw: &str) {
    let Some(action) = parse_deep_link(raw) else {
        return;
    };
    match action {
        DeepLinkAction::AddStickerPack {
            pack_id,
            pack_key_base64,
        } => bridge_events::emit_deep_link(
            app_handle,
            "add-sticker-pack",
            serde_json::json!({ "packId": pack_id, "packKey": pack_key_base64 }),
        ),
        DeepLinkAction::JoinGroup { invite_code } => bridge_events::emit_deep_link(
            app_handle,
            "join-group",
            serde_json::json!({ "inviteCode": invite_code }),
        ),
        DeepLinkAction::ShowConversation { token } => bridge_events::emit_deep_link(
            app_handle,
            "show-conversation",
            serde_json::json!({ "token": token }),
        ),
        // Captcha responses go to the challenge handler, not the main router.
        DeepLinkAction::Captcha { token } => {
            bridge_events::emit_challenge_response(app_handle, &token)
        }
        DeepLinkAction::Unknown { raw } => {
            log::info!("deep link with unknown command: {raw}");
            if app_handle.get_webview_window(MAIN_WINDOW_LABEL).is_some() {
                bridge_events::emit_unknown_deep_link(app_handle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sticker_pack_key_is_reencoded_from_hex_to_base64() {
        let action =
            parse_deep_link("courier://addstickers/?pack_id=abc&pack_key=ff00").expect("parses");
        assert_eq!(
            action,
            DeepLinkAction::AddStickerPack {
                pack_id: "abc".to_string(),
                // base64 of [0xff, 0x00]
                pack_key_base64: "/wA=".to_string(),
            }
        );
    }

    #[test]
    fn https_form_carries_args_in_the_fragment() {
        let action = parse_deep_link("https://go.courier.chat/addstickers/#pack_id=abc&pack_key=ff00")
            .expect("parses");
        assert_eq!(
            action,
            DeepLinkAction::AddStickerPack {
                pack_id: "abc".to_string(),
                pack_key_base64: "/wA=".to_string(),
            }
        );
    }

    #[test]
    fn join_links_use_the_fragment_as_invite_code() {
        assert_eq!(
            parse_deep_link("courier://join/#invite-xyz"),
            Some(DeepLinkAction::JoinGroup {
                invite_code: "invite-xyz".to_string()
            })
        );
        assert_eq!(
            parse_deep_link("https://go.courier.chat/join/#invite-xyz"),
            Some(DeepLinkAction::JoinGroup {
                invite_code: "invite-xyz".to_string()
            })
        );
    }

    #[test]
    fn show_conversation_takes_a_token() {
        assert_eq!(
            parse_deep_link("courier://show-conversation?token=t0"),
            Some(DeepLinkAction::ShowConversation {
                token: "t0".to_string()
            })
        );
    }

    #[test]
    fn captcha_links_route_to_the_challenge_handler() {
        assert_eq!(
            parse_deep_link("couriercaptcha://response-token"),
            Some(DeepLinkAction::Captcha {
                token: "response-token".to_string()
            })
        );
    }

    #[test]
    fn malformed_input_never_panics() {
        for raw in [
            "",
            "not a url",
            "courier://",
            "courier://addstickers/?pack_id=&pack_key=ff00",
            "courier://addstickers/?pack_id=abc&pack_key=zz",
            "https://evil.example/addstickers/#pack_id=a&pack_key=ff",
            "ftp://go.courier.chat/join/#x",
            "couriercaptcha://",
        ] {
            let parsed = parse_deep_link(raw);
            assert!(
                parsed.is_none() || matches!(parsed, Some(DeepLinkAction::Unknown { .. })),
                "unexpected parse for {raw:?}: {parsed:?}"
            );
        }
    }

    #[test]
    fn unknown_command_falls_back_instead_of_failing() {
        assert!(matches!(
            parse_deep_link("courier://frobnicate?x=1"),
            Some(DeepLinkAction::Unknown { .. })
        ));
    }

    #[test]
    fn argv_scan_picks_the_first_deep_link() {
        let args = vec![
            "/usr/bin/courier".to_string(),
            "--no-sandbox".to_string(),
            "courier://join/#abc".to_string(),
        ];
        assert_eq!(
            deep_link_from_argv(&args),
            Some("courier://join/#abc".to_string())
        );
        assert_eq!(deep_link_from_argv(&["courier".to_string()]), None);
    }
}
