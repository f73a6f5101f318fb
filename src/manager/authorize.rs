use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use tokio_util::sync::CancellationToken;

use super::Manager;
use crate::{
    api::ChallengeStatus,
    challenge::{
        Authorization, Challenge, ChallengeType, Dns01Challenge, Http01Challenge,
        HTTP_CHALLENGE_DIR,
    },
    client::AcmeClient,
    dns::{DnsResolver, PollPolicy, PropagationWait},
    error::{Error, Result},
    util::{write_atomic, StagedFile},
};

/// Web root `http-01` challenge files are placed under when none is configured.
pub const DEFAULT_WEB_ROOT: &str = "public";

/// How [`Manager::authorize_for_domain()`] proves control over a domain.
#[derive(Debug, Clone, Default)]
pub struct AuthorizeOptions {
    web_root: Option<PathBuf>,
    challenge: ChallengeType,
    automatic_verification: bool,
    custom_nameservers: Option<Vec<String>>,
    verbose: bool,
    silent_instructions: bool,
    poll_policy: PollPolicy,
    cancellation: Option<CancellationToken>,
}

impl AuthorizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory served as the domain's web root. Defaults to [`DEFAULT_WEB_ROOT`].
    pub fn web_root(mut self, web_root: impl Into<PathBuf>) -> Self {
        self.web_root = Some(web_root.into());
        self
    }

    pub fn challenge(mut self, challenge: ChallengeType) -> Self {
        self.challenge = challenge;
        self
    }

    /// For `dns-01`, wait for the record to propagate and request verification.
    pub fn automatic_verification(mut self, enabled: bool) -> Self {
        self.automatic_verification = enabled;
        self
    }

    /// Nameservers passed to the resolver while waiting for a `dns-01` record.
    pub fn custom_nameservers(mut self, nameservers: Vec<String>) -> Self {
        self.custom_nameservers = Some(nameservers);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Do not print the `dns-01` record instructions.
    pub fn silent_instructions(mut self, silent: bool) -> Self {
        self.silent_instructions = silent;
        self
    }

    pub fn poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    /// Aborts the `dns-01` propagation wait once `token` is cancelled.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Outcome of [`Manager::authorize_for_domain()`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorized {
    /// Challenge status as reported by the ACME provider.
    Status(ChallengeStatus),

    /// A `dns-01` challenge still to be published and submitted by the caller, see
    /// [`Manager::request_verification()`].
    Challenge(Dns01Challenge),
}

impl<C: AcmeClient, R: DnsResolver> Manager<C, R> {
    /// Proves control over `domain`.
    ///
    /// With `http-01`, the challenge file is written below the web root and the current challenge
    /// status is returned. Verification is left to the caller or the ACME provider.
    ///
    /// With `dns-01`, instructions for the TXT record are printed to stdout unless silenced. Without
    /// automatic verification the challenge is returned as is. With it, this waits until the record
    /// is visible, requests verification and returns the resulting status.
    ///
    /// Every call requests a new authorization from the ACME provider.
    pub async fn authorize_for_domain(
        &mut self,
        domain: &str,
        options: &AuthorizeOptions,
    ) -> Result<Authorized> {
        let authorization = self.authorize(domain).await?;

        match options.challenge {
            ChallengeType::Http01 => {
                let challenge = authorization
                    .into_http01()
                    .ok_or_else(|| missing_challenge(domain, ChallengeType::Http01))?;

                let web_root = options
                    .web_root
                    .as_deref()
                    .unwrap_or(Path::new(DEFAULT_WEB_ROOT));
                place_http_challenge(web_root, &challenge).await?;

                let status = self.challenge_status(&challenge).await?;
                Ok(Authorized::Status(status))
            }

            ChallengeType::Dns01 => {
                let challenge = authorization
                    .into_dns01()
                    .ok_or_else(|| missing_challenge(domain, ChallengeType::Dns01))?;

                if let Some(instructions) = instructions_for(&challenge, options) {
                    println!("{instructions}");
                }

                if !options.automatic_verification {
                    return Ok(Authorized::Challenge(challenge));
                }

                log::info!("Waiting until the TXT record {} is set", challenge.fqdn());

                PropagationWait::new(&self.resolver)
                    .nameservers(options.custom_nameservers.as_deref())
                    .policy(options.poll_policy)
                    .verbose(options.verbose)
                    .cancellation(options.cancellation.as_ref())
                    .wait_for_record(challenge.domain(), challenge.record_content())
                    .await?;

                log::info!("Valid TXT record found, requesting verification");

                let status = self
                    .verify_after(&challenge, options.poll_policy.verification_delay)
                    .await?;
                Ok(Authorized::Status(status))
            }
        }
    }
}

impl<C: AcmeClient, R> Manager<C, R> {
    /// Requests a new authorization for `domain`.
    pub async fn authorize(&mut self, domain: &str) -> Result<Authorization> {
        log::debug!("Request authorization for {domain}");

        let api_auth = self.client.authorize(domain).await?;
        Authorization::from_api(&api_auth, self.account.key()).map_err(Error::AccountKey)
    }

    /// Asks the ACME provider to verify `challenge`.
    ///
    /// The status is sampled one second after the request. The ACME provider may not have
    /// finished by then; poll [`Manager::challenge_status()`] when the final outcome matters.
    pub async fn request_verification<Ch>(&mut self, challenge: &Ch) -> Result<ChallengeStatus>
    where
        Ch: Challenge + ?Sized,
    {
        self.verify_after(challenge, PollPolicy::default().verification_delay)
            .await
    }

    /// Fetches the current status of `challenge`.
    pub async fn challenge_status<Ch>(&mut self, challenge: &Ch) -> Result<ChallengeStatus>
    where
        Ch: Challenge + ?Sized,
    {
        Ok(self.client.challenge_status(challenge.url()).await?)
    }

    async fn verify_after<Ch>(&mut self, challenge: &Ch, delay: Duration) -> Result<ChallengeStatus>
    where
        Ch: Challenge + ?Sized,
    {
        log::debug!("Request verification of {}", challenge.url());
        self.client.request_verification(challenge.url()).await?;

        tokio::time::sleep(delay).await;

        self.challenge_status(challenge).await
    }
}

/// Writes the challenge file to `<web_root>/.well-known/acme-challenge/<token>`, replacing any
/// previous file.
async fn place_http_challenge(web_root: &Path, challenge: &Http01Challenge) -> Result<()> {
    let token = challenge.token();

    // tokens are base64url; anything else could escape the challenge directory
    if token.is_empty()
        || !token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid http-01 token {token:?}"),
        )
        .into());
    }

    let dir = web_root.join(HTTP_CHALLENGE_DIR);
    tokio::fs::create_dir_all(&dir).await?;
    write_atomic(
        &dir,
        vec![StagedFile::public(token, challenge.file_content().as_bytes())],
    )
    .await?;

    log::debug!("Placed http-01 challenge at {}", dir.join(token).display());

    Ok(())
}

/// The record instructions to show the operator, unless silenced.
fn instructions_for(challenge: &Dns01Challenge, options: &AuthorizeOptions) -> Option<String> {
    (!options.silent_instructions).then(|| challenge.instructions().to_string())
}

fn missing_challenge(domain: &str, challenge: ChallengeType) -> Error {
    Error::MissingChallenge {
        domain: domain.to_owned(),
        challenge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{self, FakeCa, StubResolver};

    fn manager(ca: &FakeCa, resolver: StubResolver) -> Manager<FakeCa, StubResolver> {
        Manager::new(test::account(), ca.clone()).with_resolver(resolver)
    }

    /// Challenges of the `n`th authorization handed out by a [`FakeCa`].
    fn nth_authorization(manager: &Manager<FakeCa, StubResolver>, n: usize) -> Authorization {
        let api_auth = test::api_authorization("example.com", n);
        Authorization::from_api(&api_auth, manager.account().key()).unwrap()
    }

    #[tokio::test]
    async fn test_http_challenge_written() {
        let tmp = tempfile::tempdir().unwrap();
        let web_root = tmp.path().join("srv/public");

        let ca = FakeCa::default();
        let mut manager = manager(&ca, StubResolver::new([vec!["unused"]]));

        let options = AuthorizeOptions::new().web_root(&web_root);
        let res = manager
            .authorize_for_domain("example.com", &options)
            .await
            .unwrap();
        assert_eq!(res, Authorized::Status(ChallengeStatus::Pending));

        let auth = nth_authorization(&manager, 1);
        let expected = auth.http01().unwrap();
        let path = web_root.join(".well-known/acme-challenge/http-token-1");
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            expected.file_content()
        );

        let state = ca.state();
        assert_eq!(state.status_checks, vec![expected.url().to_owned()]);
        assert!(state.verifications.is_empty());
        drop(state);

        assert!(manager.resolver.lookups().is_empty());
    }

    #[tokio::test]
    async fn test_http_challenge_not_cached() {
        let tmp = tempfile::tempdir().unwrap();
        let challenge_dir = tmp.path().join(HTTP_CHALLENGE_DIR);
        let first_path = challenge_dir.join("http-token-1");

        std::fs::create_dir_all(&challenge_dir).unwrap();
        std::fs::write(&first_path, "stale").unwrap();

        let ca = FakeCa::default();
        let mut manager = manager(&ca, StubResolver::new([vec!["unused"]]));
        let options = AuthorizeOptions::new().web_root(tmp.path());

        manager
            .authorize_for_domain("example.com", &options)
            .await
            .unwrap();
        manager
            .authorize_for_domain("example.com", &options)
            .await
            .unwrap();

        assert_eq!(ca.state().authorizations, vec!["example.com", "example.com"]);

        let first = nth_authorization(&manager, 1);
        assert_eq!(
            std::fs::read_to_string(&first_path).unwrap(),
            first.http01().unwrap().file_content()
        );

        let second = nth_authorization(&manager, 2);
        assert_eq!(
            std::fs::read_to_string(challenge_dir.join("http-token-2")).unwrap(),
            second.http01().unwrap().file_content()
        );

        // no staging files left behind
        assert_eq!(std::fs::read_dir(&challenge_dir).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_http_challenge_rejects_unsafe_token() {
        let tmp = tempfile::tempdir().unwrap();

        let ca = FakeCa::default();
        ca.state().http_token = Some("../../escape".to_owned());
        let mut manager = manager(&ca, StubResolver::new([vec!["unused"]]));

        let options = AuthorizeOptions::new().web_root(tmp.path().join("public"));
        let err = manager
            .authorize_for_domain("example.com", &options)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert!(!tmp.path().join("escape").exists());
        assert!(ca.state().status_checks.is_empty());
    }

    #[tokio::test]
    async fn test_dns_manual() {
        let ca = FakeCa::default();
        let mut manager = manager(&ca, StubResolver::new([vec!["unused"]]));

        let options = AuthorizeOptions::new()
            .challenge(ChallengeType::Dns01)
            .silent_instructions(true);

        let res = manager
            .authorize_for_domain("example.com", &options)
            .await
            .unwrap();

        let Authorized::Challenge(challenge) = res else {
            panic!("expected a pending dns-01 challenge, got {res:?}");
        };
        assert_eq!(&challenge, nth_authorization(&manager, 1).dns01().unwrap());
        assert_eq!(challenge.record_name(), "_acme-challenge");
        assert_eq!(challenge.record_type(), "TXT");

        assert!(manager.resolver.lookups().is_empty());
        assert!(ca.state().verifications.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dns_automatic() {
        let ca = FakeCa::default();
        let initial = manager(&ca, StubResolver::new([vec!["unused"]]));
        let auth = nth_authorization(&initial, 1);
        let record_content = auth.dns01().unwrap().record_content();

        let resolver = StubResolver::new([vec!["stale"], vec!["stale"], vec![record_content]]);
        let mut manager = initial.with_resolver(resolver);

        let options = AuthorizeOptions::new()
            .challenge(ChallengeType::Dns01)
            .automatic_verification(true)
            .custom_nameservers(vec!["https://ns.example/dns-query".to_owned()])
            .silent_instructions(true);

        let start = tokio::time::Instant::now();
        let res = manager
            .authorize_for_domain("example.com", &options)
            .await
            .unwrap();

        // two poll intervals, then the verification delay
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert_eq!(res, Authorized::Status(ChallengeStatus::Valid));

        let lookups = manager.resolver.lookups();
        assert_eq!(lookups.len(), 3);
        assert_eq!(
            lookups[0],
            (
                "_acme-challenge.example.com".to_owned(),
                Some(vec!["https://ns.example/dns-query".to_owned()])
            )
        );

        let state = ca.state();
        assert_eq!(state.verifications, vec![auth.dns01().unwrap().url()]);
        assert_eq!(state.status_checks, state.verifications);
    }

    #[test]
    fn test_instructions_unless_silenced() {
        let account = test::account();
        let api_auth = test::api_authorization("example.com", 1);
        let auth = Authorization::from_api(&api_auth, account.key()).unwrap();
        let challenge = auth.dns01().unwrap();

        let shown = instructions_for(challenge, &AuthorizeOptions::new()).unwrap();
        assert!(shown.contains(" - Name: _acme-challenge.example.com\n"));
        assert!(shown.contains(&format!(" - Value: {}\n", challenge.record_content())));

        let silenced = AuthorizeOptions::new().silent_instructions(true);
        assert!(instructions_for(challenge, &silenced).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dns_automatic_verbose_with_instructions() {
        let ca = FakeCa::default();
        let initial = manager(&ca, StubResolver::new([vec!["unused"]]));
        let auth = nth_authorization(&initial, 1);
        let record_content = auth.dns01().unwrap().record_content();

        let resolver = StubResolver::new([vec!["stale"], vec![record_content]]);
        let mut manager = initial.with_resolver(resolver);

        let options = AuthorizeOptions::new()
            .challenge(ChallengeType::Dns01)
            .automatic_verification(true)
            .verbose(true)
            .silent_instructions(false);

        let res = manager
            .authorize_for_domain("example.com", &options)
            .await
            .unwrap();

        assert_eq!(res, Authorized::Status(ChallengeStatus::Valid));
        assert_eq!(manager.resolver.lookups().len(), 2);
        assert_eq!(ca.state().verifications.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dns_automatic_times_out() {
        let ca = FakeCa::default();
        let mut manager = manager(&ca, StubResolver::new([vec!["stale"]]));

        let options = AuthorizeOptions::new()
            .challenge(ChallengeType::Dns01)
            .automatic_verification(true)
            .silent_instructions(true)
            .poll_policy(PollPolicy {
                timeout: Duration::from_secs(60),
                ..PollPolicy::default()
            });

        let err = manager
            .authorize_for_domain("example.com", &options)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DnsPropagationTimeout { .. }));
        assert!(ca.state().verifications.is_empty());
    }

    #[tokio::test]
    async fn test_authorization_failure_propagates() {
        let ca = FakeCa::default();
        ca.state().authorize_problem = Some(crate::api::Problem::new(
            "urn:ietf:params:acme:error:rejectedIdentifier",
            "domain is forbidden",
        ));
        let mut manager = manager(&ca, StubResolver::new([vec!["unused"]]));

        let err = manager
            .authorize_for_domain("example.com", &AuthorizeOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Client(_)));
        assert_eq!(ca.state().authorizations.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_challenge() {
        let ca = FakeCa::default();
        ca.state().offer_dns = false;
        let mut manager = manager(&ca, StubResolver::new([vec!["unused"]]));

        let options = AuthorizeOptions::new()
            .challenge(ChallengeType::Dns01)
            .silent_instructions(true);
        let err = manager
            .authorize_for_domain("example.com", &options)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::MissingChallenge {
                challenge: ChallengeType::Dns01,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_verification() {
        let ca = FakeCa::default();
        ca.state().verified_status = ChallengeStatus::Invalid;
        let mut manager = manager(&ca, StubResolver::new([vec!["unused"]]));

        let auth = manager.authorize("example.com").await.unwrap();
        let challenge = auth.dns01().unwrap();

        let start = tokio::time::Instant::now();
        let status = manager.request_verification(challenge).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(1));
        assert_eq!(status, ChallengeStatus::Invalid);
        assert_eq!(ca.state().verifications, vec![challenge.url().to_owned()]);
    }
}
