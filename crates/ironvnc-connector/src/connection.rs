use core::any::Any;
use core::mem;

use ironvnc_core::{WriteBuf, decode, encode_buf};
use ironvnc_pdu::MessageHint;
use ironvnc_pdu::handshake::{
    ClientInit, ProtocolVersion, ProtocolVersionHint, SecurityChallenge, SecurityChallengeHint, SecurityResult,
    SecurityResultHint, SecurityType, ServerInit, ServerInitHint, SupportedSecurityTypes, SupportedSecurityTypesHint,
};

use crate::{
    Config, ConnectorError, ConnectorErrorExt as _, ConnectorResult, DesktopSize, Sequence, State, Written, auth,
};

/// Everything negotiated by the connection sequence, handed over to the session.
#[derive(Debug, Clone)]
pub struct ConnectionResult {
    pub version: ProtocolVersion,
    pub desktop_size: DesktopSize,
    pub pixel_format: ironvnc_pdu::handshake::PixelFormat,
    pub server_name: String,
}

#[derive(Default, Debug)]
#[non_exhaustive]
pub enum ClientConnectorState {
    #[default]
    Consumed,

    WaitProtocolVersion,
    WaitSecurityTypes {
        version: ProtocolVersion,
    },
    WaitAuthChallenge {
        version: ProtocolVersion,
    },
    WaitSecurityResult {
        version: ProtocolVersion,
    },
    SendClientInit {
        version: ProtocolVersion,
    },
    WaitServerInit {
        version: ProtocolVersion,
    },
    Connected {
        result: ConnectionResult,
    },
}

impl State for ClientConnectorState {
    fn name(&self) -> &'static str {
        match self {
            Self::Consumed => "Consumed",
            Self::WaitProtocolVersion => "WaitProtocolVersion",
            Self::WaitSecurityTypes { .. } => "WaitSecurityTypes",
            Self::WaitAuthChallenge { .. } => "WaitAuthChallenge",
            Self::WaitSecurityResult { .. } => "WaitSecurityResult",
            Self::SendClientInit { .. } => "SendClientInit",
            Self::WaitServerInit { .. } => "WaitServerInit",
            Self::Connected { .. } => "Connected",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Drives the RFB connection sequence, from the server's version string up to
/// the server init message.
///
/// The server speaks first, so the initial state waits for input.
#[derive(Debug)]
pub struct ClientConnector {
    pub config: Config,
    pub state: ClientConnectorState,
}

impl ClientConnector {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: ClientConnectorState::WaitProtocolVersion,
        }
    }

    /// Consumes the connector and returns what was negotiated.
    pub fn into_result(self) -> ConnectorResult<ConnectionResult> {
        match self.state {
            ClientConnectorState::Connected { result } => Ok(result),
            _ => Err(general_err!("connector sequence is not connected")),
        }
    }
}

impl Sequence for ClientConnector {
    fn next_message_hint(&self) -> Option<&dyn MessageHint> {
        match &self.state {
            ClientConnectorState::Consumed => None,
            ClientConnectorState::WaitProtocolVersion => Some(&ProtocolVersionHint),
            ClientConnectorState::WaitSecurityTypes { .. } => Some(&SupportedSecurityTypesHint),
            ClientConnectorState::WaitAuthChallenge { .. } => Some(&SecurityChallengeHint),
            ClientConnectorState::WaitSecurityResult { .. } => Some(&SecurityResultHint),
            ClientConnectorState::SendClientInit { .. } => None,
            ClientConnectorState::WaitServerInit { .. } => Some(&ServerInitHint),
            ClientConnectorState::Connected { .. } => None,
        }
    }

    fn state(&self) -> &dyn State {
        &self.state
    }

    fn step(&mut self, input: &[u8], output: &mut WriteBuf) -> ConnectorResult<Written> {
        let (written, next_state) = match mem::take(&mut self.state) {
            // Invalid state
            ClientConnectorState::Consumed => {
                return Err(general_err!("connector sequence state is consumed (this is a bug)"));
            }

            //== Protocol Version Handshake ==//
            // The server announces the highest version it supports; the reply
            // is the element-wise minimum of that and ours.
            ClientConnectorState::WaitProtocolVersion => {
                let server_version = decode::<ProtocolVersion>(input).map_err(ConnectorError::decode)?;

                debug!(%server_version, "Received");

                let version = ProtocolVersion::RFB_3_8.min(server_version);

                debug!(%version, "Negotiated");

                let written = encode_buf(&version, output).map_err(ConnectorError::encode)?;

                (Written::from_size(written)?, ClientConnectorState::WaitSecurityTypes {
                    version,
                })
            }

            //== Security Handshake ==//
            // Pick the strongest security type we implement out of the
            // server's list: None first, VNC authentication second.
            ClientConnectorState::WaitSecurityTypes { version } => {
                let offered = decode::<SupportedSecurityTypes>(input).map_err(ConnectorError::decode)?;

                debug!(message = ?offered, "Received");

                let types = match offered {
                    SupportedSecurityTypes::Types(types) => types,
                    SupportedSecurityTypes::Failure(reason) => {
                        return Err(security_err!("Security", "{reason}"));
                    }
                };

                if types.contains(&SecurityType::INVALID) {
                    return Err(security_err!("Security", "server offered the invalid security type"));
                }

                let (selected, next_state) = if types.contains(&SecurityType::NONE) {
                    (SecurityType::NONE, ClientConnectorState::WaitSecurityResult { version })
                } else if types.contains(&SecurityType::VNC_AUTHENTICATION) {
                    if self.config.password.is_none() {
                        return Err(security_err!("Security", "password required"));
                    }

                    (
                        SecurityType::VNC_AUTHENTICATION,
                        ClientConnectorState::WaitAuthChallenge { version },
                    )
                } else {
                    return Err(security_err!("Security", "no supported security type"));
                };

                debug!(%selected, "Selected security type");

                let written = encode_buf(&selected, output).map_err(ConnectorError::encode)?;

                (Written::from_size(written)?, next_state)
            }
            ClientConnectorState::WaitAuthChallenge { version } => {
                let challenge = decode::<SecurityChallenge>(input).map_err(ConnectorError::decode)?;

                // Checked before the security type was selected.
                let Some(password) = self.config.password.as_deref() else {
                    return Err(security_err!("SecurityChallenge", "password required"));
                };

                let response = auth::encrypt_challenge(challenge, password);

                let written = encode_buf(&response, output).map_err(ConnectorError::encode)?;

                (Written::from_size(written)?, ClientConnectorState::WaitSecurityResult {
                    version,
                })
            }
            ClientConnectorState::WaitSecurityResult { version } => {
                let result = decode::<SecurityResult>(input).map_err(ConnectorError::decode)?;

                match result {
                    SecurityResult::Ok => {}
                    SecurityResult::Failed(reason) => {
                        error!(%reason, "Authentication failed");
                        return Err(security_err!("SecurityResult", "{reason}"));
                    }
                }

                (Written::Nothing, ClientConnectorState::SendClientInit { version })
            }

            //== Initialization ==//
            ClientConnectorState::SendClientInit { version } => {
                let client_init = ClientInit {
                    shared: self.config.shared,
                };

                debug!(message = ?client_init, "Send");

                let written = encode_buf(&client_init, output).map_err(ConnectorError::encode)?;

                (Written::from_size(written)?, ClientConnectorState::WaitServerInit {
                    version,
                })
            }
            ClientConnectorState::WaitServerInit { version } => {
                let server_init = decode::<ServerInit>(input).map_err(ConnectorError::decode)?;

                debug!(message = ?server_init, "Received");

                info!(
                    name = %server_init.name,
                    width = server_init.width,
                    height = server_init.height,
                    "Connected"
                );

                (Written::Nothing, ClientConnectorState::Connected {
                    result: ConnectionResult {
                        version,
                        desktop_size: DesktopSize {
                            width: server_init.width,
                            height: server_init.height,
                        },
                        pixel_format: server_init.pixel_format,
                        server_name: server_init.name,
                    },
                })
            }

            //== Connected ==//
            // The client connector job is done.
            ClientConnectorState::Connected { .. } => return Err(general_err!("already connected")),
        };

        self.state = next_state;

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use ironvnc_pdu::handshake::PixelFormat;
    use rstest::rstest;

    use crate::ConnectorErrorKind;

    use super::*;

    const SERVER_INIT: &[u8] = &[
        0x04, 0x00, 0x03, 0x00, // 1024 x 768
        0x20, 0x18, 0x00, 0x01, // 32 bpp, depth 24, little endian, true color
        0x00, 0xff, 0x00, 0xff, 0x00, 0xff, // maxima
        0x10, 0x08, 0x00, // shifts
        0x00, 0x00, 0x00, // padding
        0x00, 0x00, 0x00, 0x04, // name length
        b't', b'e', b's', b't',
    ];

    const ZERO_KEY_CIPHERTEXT: [u8; 8] = [0x8c, 0xa6, 0x4d, 0xe9, 0xc1, 0xb1, 0x23, 0xa7];

    fn step(connector: &mut ClientConnector, input: &[u8]) -> ConnectorResult<(Written, Vec<u8>)> {
        let mut buf = WriteBuf::new();
        let written = connector.step(input, &mut buf)?;
        Ok((written, buf.filled().to_vec()))
    }

    #[test]
    fn handshake_without_authentication() {
        let mut connector = ClientConnector::new(Config::default());

        assert!(connector.next_message_hint().is_some());
        let (written, output) = step(&mut connector, b"RFB 003.008\n").unwrap();
        assert_eq!(written.size(), Some(12));
        assert_eq!(output, b"RFB 003.008\n");

        // None (1) is preferred over VNC authentication (2).
        let (_, output) = step(&mut connector, &[0x02, 0x02, 0x01]).unwrap();
        assert_eq!(output, [0x01]);

        let (written, _) = step(&mut connector, &[0x00, 0x00, 0x00, 0x00]).unwrap();
        assert!(written.is_nothing());

        // Client init needs no input.
        assert!(connector.next_message_hint().is_none());
        let (_, output) = step(&mut connector, &[]).unwrap();
        assert_eq!(output, [0x01]); // shared by default

        let (written, _) = step(&mut connector, SERVER_INIT).unwrap();
        assert!(written.is_nothing());
        assert!(connector.state.is_terminal());

        let result = connector.into_result().unwrap();
        assert_eq!(result.version, ProtocolVersion { major: 3, minor: 8 });
        assert_eq!(result.desktop_size, DesktopSize {
            width: 1024,
            height: 768,
        });
        assert_eq!(result.server_name, "test");
        assert_eq!(result.pixel_format, PixelFormat {
            bits_per_pixel: 32,
            depth: 24,
            big_endian: false,
            true_color: true,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        });
    }

    #[rstest]
    #[case(b"RFB 003.003\n", b"RFB 003.003\n")]
    #[case(b"RFB 003.007\n", b"RFB 003.007\n")]
    #[case(b"RFB 004.000\n", b"RFB 003.008\n")]
    fn replies_with_negotiated_version(#[case] server: &[u8], #[case] expected: &[u8]) {
        let mut connector = ClientConnector::new(Config::default());

        let (_, output) = step(&mut connector, server).unwrap();

        assert_eq!(output, expected);
    }

    #[test]
    fn vnc_authentication_writes_one_response() {
        let mut connector = ClientConnector::new(Config {
            password: Some(String::new()),
            shared: true,
        });

        step(&mut connector, b"RFB 003.008\n").unwrap();

        // Only VNC authentication offered.
        let (_, output) = step(&mut connector, &[0x01, 0x02]).unwrap();
        assert_eq!(output, [0x02]);

        // Zero challenge with an empty password: the key pads to all zeroes,
        // so the response is the zero-key DES ciphertext, twice.
        let (written, output) = step(&mut connector, &[0u8; 16]).unwrap();
        assert_eq!(written.size(), Some(16));
        assert_eq!(output[..8], ZERO_KEY_CIPHERTEXT);
        assert_eq!(output[8..], ZERO_KEY_CIPHERTEXT);

        let (written, _) = step(&mut connector, &[0x00, 0x00, 0x00, 0x00]).unwrap();
        assert!(written.is_nothing());
    }

    #[test]
    fn vnc_authentication_without_password_is_refused() {
        let mut connector = ClientConnector::new(Config::default());

        step(&mut connector, b"RFB 003.008\n").unwrap();

        // VNC authentication demands a password; with none configured the
        // sequence aborts before the type selection is written.
        let mut buf = WriteBuf::new();
        let err = connector.step(&[0x01, 0x02], &mut buf).unwrap_err();

        match err.kind() {
            ConnectorErrorKind::Security(reason) => assert_eq!(reason, "password required"),
            other => panic!("unexpected error kind: {other:?}"),
        }
        assert!(buf.filled().is_empty());
    }

    #[test]
    fn invalid_security_type_aborts_before_any_write() {
        let mut connector = ClientConnector::new(Config::default());

        step(&mut connector, b"RFB 003.008\n").unwrap();

        let mut buf = WriteBuf::new();
        let err = connector.step(&[0x01, 0x00], &mut buf).unwrap_err();

        assert!(matches!(err.kind(), ConnectorErrorKind::Security(_)));
        assert!(buf.filled().is_empty());
    }

    #[test]
    fn unsupported_security_types_abort() {
        let mut connector = ClientConnector::new(Config::default());

        step(&mut connector, b"RFB 003.008\n").unwrap();

        let err = step(&mut connector, &[0x02, 0x05, 0x10]).unwrap_err();

        assert!(matches!(err.kind(), ConnectorErrorKind::Security(_)));
    }

    #[test]
    fn refusal_reason_is_surfaced() {
        let mut connector = ClientConnector::new(Config::default());

        step(&mut connector, b"RFB 003.008\n").unwrap();

        let err = step(&mut connector, &[0x00, 0x00, 0x00, 0x00, 0x04, b'b', b'u', b's', b'y']).unwrap_err();

        match err.kind() {
            ConnectorErrorKind::Security(reason) => assert_eq!(reason, "busy"),
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn authentication_failure_reason_is_surfaced() {
        let mut connector = ClientConnector::new(Config {
            password: Some("secret".to_owned()),
            shared: true,
        });

        step(&mut connector, b"RFB 003.008\n").unwrap();
        step(&mut connector, &[0x01, 0x02]).unwrap();
        step(&mut connector, &[0x07; 16]).unwrap();

        let err = step(&mut connector, &[
            0x00, 0x00, 0x00, 0x01, // failed
            0x00, 0x00, 0x00, 0x0e, // reason length
            b'w', b'r', b'o', b'n', b'g', b' ', b'p', b'a', b's', b's', b'w', b'o', b'r', b'd',
        ])
        .unwrap_err();

        match err.kind() {
            ConnectorErrorKind::Security(reason) => assert_eq!(reason, "wrong password"),
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn unshared_connection_sends_zero_flag() {
        let mut connector = ClientConnector::new(Config {
            password: None,
            shared: false,
        });

        step(&mut connector, b"RFB 003.008\n").unwrap();
        step(&mut connector, &[0x01, 0x01]).unwrap();
        step(&mut connector, &[0x00, 0x00, 0x00, 0x00]).unwrap();

        let (_, output) = step(&mut connector, &[]).unwrap();

        assert_eq!(output, [0x00]);
    }
}
