// Optional DockerRepo tests when Docker daemon is available

use netpulse::docker_repo::{ContainerPortSource, DockerRepo};

#[tokio::test]
async fn docker_repo_connect_and_list_published_ports() {
    let repo = match DockerRepo::connect() {
        Ok(r) => r,
        Err(_) => return, // Skip when Docker is not available (e.g. CI without Docker)
    };
    // The client builds lazily; an unreachable daemon surfaces here as an error, not a panic.
    if let Ok(ports) = repo.list_container_ports().await {
        assert!(ports.iter().all(|p| p.host_port > 0));
        assert!(ports.iter().all(|p| !p.container_name.starts_with('/')));
    }
}
