/// Implements `Display` for a type through its `as_str` method.
///
/// The type must provide an inherent `fn as_str(&self) -> &'static str`.
#[macro_export]
macro_rules! impl_display_as_str {
    ($type:ty) => {
        impl ::std::fmt::Display for $type {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Implements string based serialization for a type implementing `Display`.
#[macro_export]
macro_rules! impl_str_ser {
    ($type:ty) => {
        impl ::serde::ser::Serialize for $type {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
            where
                S: ::serde::ser::Serializer,
            {
                serializer.collect_str(self)
            }
        }
    };
}

/// Implements string based deserialization for a type implementing `FromStr`.
///
/// The second argument describes the expected input and shows up in error messages.
#[macro_export]
macro_rules! impl_str_de {
    ($type:ty, $expectation:expr) => {
        impl<'de> ::serde::de::Deserialize<'de> for $type {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
            where
                D: ::serde::de::Deserializer<'de>,
            {
                struct V;

                impl ::serde::de::Visitor<'_> for V {
                    type Value = $type;

                    fn expecting(
                        &self,
                        formatter: &mut ::std::fmt::Formatter<'_>,
                    ) -> ::std::fmt::Result {
                        formatter.write_str($expectation)
                    }

                    fn visit_str<E>(self, value: &str) -> ::std::result::Result<$type, E>
                    where
                        E: ::serde::de::Error,
                    {
                        value.parse().map_err(|_| {
                            ::serde::de::Error::invalid_value(
                                ::serde::de::Unexpected::Str(value),
                                &self,
                            )
                        })
                    }
                }

                deserializer.deserialize_str(V)
            }
        }
    };
}

/// Implements string based serialization and deserialization.
///
/// The type must implement both `FromStr` and `Display`.
#[macro_export]
macro_rules! impl_str_serde {
    ($type:ty, $expectation:expr) => {
        $crate::impl_str_ser!($type);
        $crate::impl_str_de!($type, $expectation);
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use similar_asserts::assert_eq;

    #[derive(Debug, PartialEq)]
    enum Shade {
        Light,
        Dark,
    }

    impl Shade {
        fn as_str(&self) -> &'static str {
            match self {
                Self::Light => "light",
                Self::Dark => "dark",
            }
        }
    }

    impl FromStr for Shade {
        type Err = ();

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "light" => Ok(Self::Light),
                "dark" => Ok(Self::Dark),
                _ => Err(()),
            }
        }
    }

    impl_display_as_str!(Shade);
    impl_str_serde!(Shade, "a shade");

    #[test]
    fn test_str_serde_roundtrip() {
        let json = serde_json::to_string(&Shade::Dark).unwrap();
        assert_eq!(json, r#""dark""#);
        assert_eq!(serde_json::from_str::<Shade>(r#""light""#).unwrap(), Shade::Light);
    }

    #[test]
    fn test_str_de_invalid() {
        let error = serde_json::from_str::<Shade>(r#""medium""#).unwrap_err();
        assert!(error.to_string().starts_with("invalid value: string \"medium\", expected a shade"));
    }
}
